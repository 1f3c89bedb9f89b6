// In-memory collaborators for service and queue tests
use crate::application::repositories::{AnalysisNotifier, DriveStore, EventStore, TelemetrySource};
use crate::domain::drive::Drive;
use crate::application::event_classifier::count_by_type;
use crate::domain::event::{DriveEventCounts, EventRecord, EventTypeCount};
use crate::domain::telemetry::TelemetryRow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct FakeTelemetrySource {
    pub rows: HashMap<String, Vec<TelemetryRow>>,
    pub failure: Option<String>,
}

#[async_trait]
impl TelemetrySource for FakeTelemetrySource {
    async fn fetch_drive_telemetry(
        &self,
        drive_id: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<TelemetryRow>> {
        if let Some(reason) = &self.failure {
            anyhow::bail!("{}", reason);
        }
        Ok(self.rows.get(drive_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeEventStore {
    pub events: HashMap<String, Vec<EventRecord>>,
    pub failure: Option<String>,
}

#[async_trait]
impl EventStore for FakeEventStore {
    async fn find_by_drive_id(&self, drive_id: &str) -> anyhow::Result<Vec<EventRecord>> {
        if let Some(reason) = &self.failure {
            anyhow::bail!("{}", reason);
        }
        Ok(self.events.get(drive_id).cloned().unwrap_or_default())
    }

    async fn count_all_by_type(&self) -> anyhow::Result<Vec<EventTypeCount>> {
        if let Some(reason) = &self.failure {
            anyhow::bail!("{}", reason);
        }
        let all: Vec<EventRecord> = self.events.values().flatten().cloned().collect();
        Ok(count_by_type(&all))
    }

    async fn count_by_type_for_drives(&self, drive_ids: &[String]) -> anyhow::Result<DriveEventCounts> {
        if let Some(reason) = &self.failure {
            anyhow::bail!("{}", reason);
        }
        Ok(drive_ids
            .iter()
            .filter_map(|id| self.events.get(id).map(|events| (id.clone(), count_by_type(events))))
            .collect())
    }
}

#[derive(Default)]
pub struct RecordingDriveStore {
    pub saved: Mutex<Vec<Drive>>,
    pub reject: bool,
}

#[async_trait]
impl DriveStore for RecordingDriveStore {
    async fn save(&self, drive: &Drive) -> anyhow::Result<()> {
        if self.reject {
            anyhow::bail!("write rejected");
        }
        self.saved.lock().unwrap().push(drive.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notified: Mutex<Vec<String>>,
    pub fail: bool,
}

#[async_trait]
impl AnalysisNotifier for RecordingNotifier {
    async fn drive_analyzed(&self, drive: &Drive) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("dashboard unavailable");
        }
        let drive_id = drive.drive_id.clone().unwrap_or_default();
        self.notified.lock().unwrap().push(drive_id);
        Ok(())
    }
}
