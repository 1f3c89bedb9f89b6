// Repository traits for the collaborators the analysis depends on
use crate::domain::drive::Drive;
use crate::domain::event::{DriveEventCounts, EventRecord, EventTypeCount};
use crate::domain::telemetry::TelemetryRow;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Analytic query service holding raw drive telemetry
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Time-ordered rows for one drive. Waiting on the query stops when
    /// `cancel` fires.
    async fn fetch_drive_telemetry(
        &self,
        drive_id: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<TelemetryRow>>;
}

/// Relational store of discrete driving events
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_by_drive_id(&self, drive_id: &str) -> anyhow::Result<Vec<EventRecord>>;

    /// Per-type totals over every recorded drive, ordered by type code
    async fn count_all_by_type(&self) -> anyhow::Result<Vec<EventTypeCount>>;

    /// Per-type counts for each of `drive_ids`. Drives without events may
    /// be missing from the result.
    async fn count_by_type_for_drives(&self, drive_ids: &[String]) -> anyhow::Result<DriveEventCounts>;
}

/// Document store keyed by `(user_id, drive_id)`; writes overwrite
#[async_trait]
pub trait DriveStore: Send + Sync {
    async fn save(&self, drive: &Drive) -> anyhow::Result<()>;
}

/// Downstream subsystem told about finished analyses
#[async_trait]
pub trait AnalysisNotifier: Send + Sync {
    async fn drive_analyzed(&self, drive: &Drive) -> anyhow::Result<()>;
}
