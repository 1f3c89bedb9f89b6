// Background work queue - fixed pool of workers draining a bounded FIFO
use crate::application::analysis_service::AnalysisJob;
use crate::domain::drive::validate_drive_id;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub workers: usize,
    /// Requests beyond this many waiting are rejected, not queued
    pub queue_capacity: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("invalid drive id: {0}")]
    InvalidDriveId(String),

    #[error("analysis queue is full")]
    Full,

    #[error("analysis queue is shut down")]
    Closed,
}

/// Producer handle. Cheap to clone; never waits.
#[derive(Clone)]
pub struct AnalysisQueue {
    sender: mpsc::Sender<String>,
    stopping: CancellationToken,
}

impl AnalysisQueue {
    /// Hand a drive over to the pool. Acceptance says nothing about whether
    /// the analysis will succeed; failures are only logged by the worker.
    pub fn request_analysis(&self, drive_id: &str) -> Result<(), EnqueueError> {
        validate_drive_id(drive_id).map_err(|e| EnqueueError::InvalidDriveId(e.to_string()))?;
        if self.stopping.is_cancelled() {
            return Err(EnqueueError::Closed);
        }

        match self.sender.try_send(drive_id.to_string()) {
            Ok(()) => {
                tracing::debug!(drive_id, "drive analysis queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(drive_id, "analysis queue full, rejecting request");
                Err(EnqueueError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EnqueueError::Closed),
        }
    }
}

pub struct WorkerPool {
    queue: AnalysisQueue,
    handles: Vec<JoinHandle<()>>,
    stopping: CancellationToken,
    abort: CancellationToken,
}

impl WorkerPool {
    /// Spawn `config.workers` long-lived tasks sharing one receiver
    pub fn start(job: Arc<dyn AnalysisJob>, config: WorkerConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let stopping = CancellationToken::new();
        let abort = CancellationToken::new();

        let handles = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    job.clone(),
                    receiver.clone(),
                    stopping.clone(),
                    abort.clone(),
                ))
            })
            .collect();

        tracing::info!(
            workers = config.workers.max(1),
            queue_capacity = config.queue_capacity.max(1),
            "analysis worker pool started"
        );

        Self {
            queue: AnalysisQueue {
                sender,
                stopping: stopping.clone(),
            },
            handles,
            stopping,
            abort,
        }
    }

    pub fn queue(&self) -> AnalysisQueue {
        self.queue.clone()
    }

    /// Stop accepting work and let workers drain what is already queued.
    /// After `grace`, in-flight upstream waits are cancelled; workers that
    /// still have not returned one more `grace` later are aborted.
    pub async fn shutdown(self, grace: Duration) {
        self.stopping.cancel();

        let abort_handles: Vec<_> = self.handles.iter().map(JoinHandle::abort_handle).collect();
        let mut all_done = Box::pin(futures::future::join_all(self.handles));
        if tokio::time::timeout(grace, &mut all_done).await.is_err() {
            tracing::warn!(?grace, "workers still busy after grace period, aborting in-flight work");
            self.abort.cancel();

            if tokio::time::timeout(grace, &mut all_done).await.is_err() {
                tracing::error!("workers ignored cancellation, aborting their tasks");
                for handle in &abort_handles {
                    handle.abort();
                }
                all_done.await;
            }
        }

        tracing::info!("analysis worker pool stopped");
    }
}

async fn worker_loop(
    worker: usize,
    job: Arc<dyn AnalysisJob>,
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    stopping: CancellationToken,
    abort: CancellationToken,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            let received = tokio::select! {
                drive_id = receiver.recv() => Some(drive_id),
                _ = stopping.cancelled() => None,
            };
            match received {
                Some(drive_id) => drive_id,
                // Once stopping, take only what is already buffered.
                None => receiver.try_recv().ok(),
            }
        };
        let Some(drive_id) = next else {
            break;
        };

        let outcome = AssertUnwindSafe(job.run(&drive_id, &abort))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(_)) => tracing::debug!(worker, drive_id = %drive_id, "drive analysis finished"),
            Ok(Err(e)) => {
                tracing::error!(worker, drive_id = %drive_id, error = %e, "drive analysis failed")
            }
            Err(_) => tracing::error!(worker, drive_id = %drive_id, "drive analysis panicked"),
        }
    }

    tracing::debug!(worker, "analysis worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drive::Drive;
    use crate::domain::error::AnalysisError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct CountingJob {
        seen: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl AnalysisJob for CountingJob {
        async fn run(&self, drive_id: &str, _cancel: &CancellationToken) -> Result<Drive, AnalysisError> {
            self.seen.lock().unwrap().push(drive_id.to_string());
            tokio::task::yield_now().await;
            if drive_id.starts_with("bad") {
                return Err(AnalysisError::NoData(drive_id.to_string()));
            }
            if drive_id.starts_with("boom") {
                panic!("analysis blew up");
            }
            Ok(Drive::default())
        }
    }

    /// Blocks until aborted, like a hung upstream query
    struct HangingJob;

    #[async_trait]
    impl AnalysisJob for HangingJob {
        async fn run(&self, _drive_id: &str, cancel: &CancellationToken) -> Result<Drive, AnalysisError> {
            cancel.cancelled().await;
            Err(AnalysisError::InvalidArgument("aborted".to_string()))
        }
    }

    /// Never returns and never looks at the abort token, like a stuck store write
    struct StuckJob;

    #[async_trait]
    impl AnalysisJob for StuckJob {
        async fn run(&self, _drive_id: &str, _cancel: &CancellationToken) -> Result<Drive, AnalysisError> {
            std::future::pending().await
        }
    }

    fn config(workers: usize, queue_capacity: usize) -> WorkerConfig {
        WorkerConfig {
            workers,
            queue_capacity,
        }
    }

    #[tokio::test]
    async fn test_every_request_runs_exactly_once() {
        let job = Arc::new(CountingJob::default());
        let pool = WorkerPool::start(job.clone(), config(4, 64));
        let queue = pool.queue();

        for i in 0..50 {
            queue.request_analysis(&format!("drive-{}", i)).unwrap();
        }
        pool.shutdown(Duration::from_secs(5)).await;

        let seen = job.seen.lock().unwrap();
        assert_eq!(seen.len(), 50);
        let unique: HashSet<&String> = seen.iter().collect();
        assert_eq!(unique.len(), 50);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_workers() {
        let job = Arc::new(CountingJob::default());
        let pool = WorkerPool::start(job.clone(), config(1, 16));
        let queue = pool.queue();

        for id in ["bad-1", "boom-1", "drive-1", "bad-2", "drive-2"] {
            queue.request_analysis(id).unwrap();
        }
        pool.shutdown(Duration::from_secs(5)).await;

        let seen = job.seen.lock().unwrap();
        assert_eq!(*seen, vec!["bad-1", "boom-1", "drive-1", "bad-2", "drive-2"]);
    }

    #[tokio::test]
    async fn test_rejects_when_full_or_closed() {
        let pool = WorkerPool::start(Arc::new(HangingJob), config(1, 1));
        let queue = pool.queue();

        // first is taken by the worker, second fills the buffer
        queue.request_analysis("drive-1").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.request_analysis("drive-2").unwrap();
        assert_eq!(queue.request_analysis("drive-3"), Err(EnqueueError::Full));
        assert!(matches!(
            queue.request_analysis("bad id"),
            Err(EnqueueError::InvalidDriveId(_))
        ));

        pool.shutdown(Duration::from_millis(50)).await;
        assert_eq!(queue.request_analysis("drive-4"), Err(EnqueueError::Closed));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_hung_work_after_grace() {
        let pool = WorkerPool::start(Arc::new(HangingJob), config(2, 4));
        let queue = pool.queue();
        queue.request_analysis("drive-1").unwrap();
        queue.request_analysis("drive-2").unwrap();

        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            pool.shutdown(Duration::from_millis(100)),
        )
        .await;

        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_aborts_workers_ignoring_cancellation() {
        let pool = WorkerPool::start(Arc::new(StuckJob), config(2, 4));
        let queue = pool.queue();
        queue.request_analysis("drive-1").unwrap();
        queue.request_analysis("drive-2").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            pool.shutdown(Duration::from_millis(100)),
        )
        .await;

        assert!(finished.is_ok());
    }
}
