// Drive analysis service - Use case reconciling telemetry and events into one record
use crate::application::event_classifier::{classify, count_by_type};
use crate::application::repositories::{AnalysisNotifier, DriveStore, EventStore, TelemetrySource};
use crate::application::telemetry_analyzer::TelemetryAnalyzer;
use crate::domain::drive::{validate_drive_id, Drive};
use crate::domain::error::AnalysisError;
use crate::domain::event::{DriveEventCounts, EventTypeCount};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One unit of background work, as seen by the worker pool
#[async_trait]
pub trait AnalysisJob: Send + Sync {
    async fn run(&self, drive_id: &str, cancel: &CancellationToken) -> Result<Drive, AnalysisError>;
}

#[derive(Clone)]
pub struct DriveAnalysisService {
    telemetry: Arc<dyn TelemetrySource>,
    events: Arc<dyn EventStore>,
    drives: Arc<dyn DriveStore>,
    notifier: Option<Arc<dyn AnalysisNotifier>>,
    analyzer: TelemetryAnalyzer,
    require_events: bool,
}

impl DriveAnalysisService {
    pub fn new(
        telemetry: Arc<dyn TelemetrySource>,
        events: Arc<dyn EventStore>,
        drives: Arc<dyn DriveStore>,
        analyzer: TelemetryAnalyzer,
    ) -> Self {
        Self {
            telemetry,
            events,
            drives,
            notifier: None,
            analyzer,
            require_events: false,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AnalysisNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn require_events(mut self, require: bool) -> Self {
        self.require_events = require;
        self
    }

    /// Fetch both sources, analyze them and merge. Telemetry-derived fields
    /// take precedence over event-derived ones.
    pub async fn analyze(
        &self,
        drive_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Drive, AnalysisError> {
        validate_drive_id(drive_id)?;

        let rows = self
            .telemetry
            .fetch_drive_telemetry(drive_id, cancel)
            .await
            .map_err(|e| AnalysisError::upstream("telemetry query", e))?;
        let from_telemetry = self.analyzer.analyze(&rows)?;

        let events = self
            .events
            .find_by_drive_id(drive_id)
            .await
            .map_err(|e| AnalysisError::upstream("event lookup", e))?;
        if events.is_empty() && self.require_events {
            return Err(AnalysisError::NoData(drive_id.to_string()));
        }
        let from_events = classify(&events);

        let mut merged = Drive::merge(from_telemetry, from_events);
        merged.drive_id.get_or_insert_with(|| drive_id.to_string());

        tracing::debug!(
            drive_id,
            rows = rows.len(),
            events = events.len(),
            "drive analyzed"
        );
        Ok(merged)
    }

    /// Analyze, persist and notify. Notification failures are logged only.
    pub async fn run(
        &self,
        drive_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Drive, AnalysisError> {
        let drive = self.analyze(drive_id, cancel).await?;

        if drive.key().is_none() {
            return Err(AnalysisError::InvalidArgument(format!(
                "drive {} has no user id in its telemetry",
                drive_id
            )));
        }

        self.drives
            .save(&drive)
            .await
            .map_err(|e| AnalysisError::Persistence {
                drive_id: drive_id.to_string(),
                source: e.into(),
            })?;
        tracing::info!(drive_id, "drive analysis saved");

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.drive_analyzed(&drive).await {
                tracing::warn!(drive_id, error = %e, "failed to notify dashboard");
            }
        }

        Ok(drive)
    }

    /// Synchronous diagnostic path: analyze without persisting
    pub async fn preview(&self, drive_id: &str) -> Result<Drive, AnalysisError> {
        self.analyze(drive_id, &CancellationToken::new()).await
    }

    /// Event-derived fields only
    pub async fn drive_events(&self, drive_id: &str) -> Result<Drive, AnalysisError> {
        validate_drive_id(drive_id)?;
        let events = self
            .events
            .find_by_drive_id(drive_id)
            .await
            .map_err(|e| AnalysisError::upstream("event lookup", e))?;
        if events.is_empty() {
            return Err(AnalysisError::NoData(drive_id.to_string()));
        }
        Ok(classify(&events))
    }

    pub async fn event_counts(&self, drive_id: &str) -> Result<Vec<EventTypeCount>, AnalysisError> {
        validate_drive_id(drive_id)?;
        let events = self
            .events
            .find_by_drive_id(drive_id)
            .await
            .map_err(|e| AnalysisError::upstream("event lookup", e))?;
        Ok(count_by_type(&events))
    }

    /// Per-type totals across every drive
    pub async fn event_totals(&self) -> Result<Vec<EventTypeCount>, AnalysisError> {
        self.events
            .count_all_by_type()
            .await
            .map_err(|e| AnalysisError::upstream("event totals", e))
    }

    /// Per-type counts for a batch of drives. Every requested id appears in
    /// the result; drives without events get an empty list.
    pub async fn event_counts_for_drives(
        &self,
        drive_ids: &[String],
    ) -> Result<DriveEventCounts, AnalysisError> {
        for drive_id in drive_ids {
            validate_drive_id(drive_id)?;
        }
        let mut unique = drive_ids.to_vec();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(DriveEventCounts::new());
        }

        let mut counts = self
            .events
            .count_by_type_for_drives(&unique)
            .await
            .map_err(|e| AnalysisError::upstream("event counts by drive", e))?;
        counts.retain(|drive_id, _| unique.binary_search(drive_id).is_ok());
        for drive_id in unique {
            counts.entry(drive_id).or_default();
        }
        Ok(counts)
    }
}

#[async_trait]
impl AnalysisJob for DriveAnalysisService {
    async fn run(&self, drive_id: &str, cancel: &CancellationToken) -> Result<Drive, AnalysisError> {
        DriveAnalysisService::run(self, drive_id, cancel).await
    }
}
