//! The worker's claim loop.
//!
//! Polls the queue every `poll_interval` and runs claimed jobs one at a
//! time. A sibling task records a heartbeat on the same cadence, which
//! also extends the lease on the job in flight. Cancellation is observed
//! between jobs; the job in flight always finishes first.

use std::sync::Arc;
use std::time::Duration;

use docflow_core::queue::JobQueue;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::task::JobExecutor;

/// Default polling interval for the claim loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct WorkerRunner {
    queue: Arc<dyn JobQueue>,
    executor: Arc<JobExecutor>,
    poll_interval: Duration,
}

impl WorkerRunner {
    pub fn new(queue: Arc<dyn JobQueue>, executor: Arc<JobExecutor>) -> Self {
        Self {
            queue,
            executor,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&self.queue),
            self.executor.worker_name().to_string(),
            self.poll_interval,
            cancel.child_token(),
        ));

        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            worker = self.executor.worker_name(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain(&cancel).await {
                        tracing::error!(error = %e, "Claim cycle failed");
                    }
                }
            }
        }

        if let Err(e) = heartbeat.await {
            tracing::warn!(error = %e, "Heartbeat task ended abnormally");
        }
    }

    /// Claim and run jobs until the queue has nothing deliverable.
    /// Returns how many jobs were run.
    pub async fn drain(&self, cancel: &CancellationToken) -> Result<usize, WorkerError> {
        let mut ran = 0;
        while !cancel.is_cancelled() {
            let Some(job) = self.queue.claim_next(self.executor.worker_name()).await? else {
                break;
            };
            self.executor.run_job(job).await?;
            ran += 1;
        }
        Ok(ran)
    }
}

async fn heartbeat_loop(
    queue: Arc<dyn JobQueue>,
    worker: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = queue.record_heartbeat(&worker).await {
                    tracing::warn!(worker = %worker, error = %e, "Heartbeat failed");
                }
            }
        }
    }
}
