// Error taxonomy for drive analysis
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Telemetry was empty or a row could not be parsed
    #[error("malformed telemetry: {0}")]
    MalformedInput(String),

    /// The caller required events but the store returned none
    #[error("no events found for drive {0}")]
    NoData(String),

    /// Every sample was at or below the idling threshold
    #[error("no samples above the idling threshold")]
    NoActivity,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{stage} failed: {source}")]
    Upstream {
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("failed to persist drive {drive_id}: {source}")]
    Persistence {
        drive_id: String,
        #[source]
        source: BoxError,
    },
}

impl AnalysisError {
    pub fn upstream(stage: &'static str, err: anyhow::Error) -> Self {
        Self::Upstream {
            stage,
            source: err.into(),
        }
    }
}
