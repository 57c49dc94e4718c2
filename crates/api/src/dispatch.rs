//! The dispatcher facade.
//!
//! Turns submissions into queued jobs and answers polls. It never runs a
//! conversion itself; workers pick jobs up from the [`JobQueue`].

use std::sync::Arc;
use std::time::Duration;

use docflow_core::fleet::{FleetMonitor, FleetStatus};
use docflow_core::job::{Document, JobView, NewJob};
use docflow_core::queue::{JobQueue, QueueError};
use docflow_core::types::JobId;
use tokio::time::Instant;

/// How often [`Dispatcher::wait_for`] re-polls.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct Dispatcher {
    queue: Arc<dyn JobQueue>,
    fleet: FleetMonitor,
    probe_timeout: Duration,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, liveness_window: Duration, probe_timeout: Duration) -> Self {
        let fleet = FleetMonitor::with_window(Arc::clone(&queue), liveness_window);
        Self {
            queue,
            fleet,
            probe_timeout,
        }
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    pub async fn submit_single(&self, document: Document) -> Result<JobId, QueueError> {
        let filename = document.filename.clone();
        let id = self.queue.submit(NewJob::single(document)).await?;
        tracing::info!(job_id = %id, filename = %filename, "Single conversion submitted");
        Ok(id)
    }

    pub async fn submit_batch(&self, documents: Vec<Document>) -> Result<JobId, QueueError> {
        let count = documents.len();
        let id = self.queue.submit(NewJob::batch(documents)).await?;
        tracing::info!(job_id = %id, documents = count, "Batch conversion submitted");
        Ok(id)
    }

    pub async fn poll(&self, id: JobId) -> Result<JobView, QueueError> {
        self.queue.poll(id).await
    }

    /// Poll until the job is terminal. `None` if `timeout` elapses first.
    pub async fn wait_for(&self, id: JobId, timeout: Duration) -> Result<Option<JobView>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            let view = self.queue.poll(id).await?;
            if view.state.is_terminal() {
                return Ok(Some(view));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Probe the worker fleet with the configured timeout.
    pub async fn fleet_status(&self) -> Result<FleetStatus, QueueError> {
        self.fleet.status(self.probe_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::conversion::JobResult;
    use docflow_core::job::JobState;
    use docflow_core::queue::MemoryJobQueue;

    fn dispatcher(queue: Arc<MemoryJobQueue>) -> Dispatcher {
        Dispatcher::new(queue, Duration::from_secs(60), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn wait_for_returns_none_on_timeout() {
        let queue = Arc::new(MemoryJobQueue::new());
        let d = dispatcher(queue);
        let id = d.submit_single(Document::new("a.pdf", b"%PDF".to_vec())).await.unwrap();

        let view = d.wait_for(id, Duration::from_millis(50)).await.unwrap();
        assert!(view.is_none());
    }

    #[tokio::test]
    async fn wait_for_returns_terminal_view() {
        let queue = Arc::new(MemoryJobQueue::new());
        let d = dispatcher(queue.clone());
        let id = d.submit_batch(vec![]).await.unwrap();

        queue.claim_next("w").await.unwrap().unwrap();
        queue.mark_running(id, "w").await.unwrap();
        queue
            .complete(id, JobResult::Batch { outcomes: vec![] })
            .await
            .unwrap();

        let view = d.wait_for(id, Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(view.state, JobState::Success);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let d = dispatcher(Arc::new(MemoryJobQueue::new()));
        let id = JobId::new_v4();
        assert!(matches!(d.poll(id).await, Err(QueueError::NotFound(missing)) if missing == id));
    }
}
