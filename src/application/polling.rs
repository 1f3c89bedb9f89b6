// Polling with exponential backoff for long-running upstream queries
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Execution state reported by the analytic query service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Pending,
    Succeeded,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Upper bound on the whole wait, checks included
    pub max_wait: Duration,
}

impl RetryPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier.max(1.0)).min(self.max_delay)
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("query failed: {0}")]
    Failed(String),

    #[error("query was cancelled upstream")]
    Cancelled,

    #[error("query still running after {0:?}")]
    TimedOut(Duration),

    #[error("polling aborted")]
    Aborted,

    #[error("query status check failed: {0:#}")]
    Status(anyhow::Error),
}

/// Call `check` until the query leaves `Pending`, sleeping between calls
/// with exponential backoff. Cancelling `cancel` stops the wait early.
pub async fn poll_until_complete<F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<(), PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<QueryState>>,
{
    let started = Instant::now();
    let mut delay = policy.initial_delay;
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Aborted);
        }

        attempts += 1;
        match check().await.map_err(PollError::Status)? {
            QueryState::Succeeded => {
                tracing::debug!(attempts, elapsed = ?started.elapsed(), "query completed");
                return Ok(());
            }
            QueryState::Failed(reason) => return Err(PollError::Failed(reason)),
            QueryState::Cancelled => return Err(PollError::Cancelled),
            QueryState::Pending => {}
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.max_wait {
            return Err(PollError::TimedOut(elapsed));
        }

        let wait = delay.min(policy.max_wait - elapsed);
        tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Aborted),
            _ = tokio::time::sleep(wait) => {}
        }
        delay = policy.next_delay(delay);
    }
}
