//! Worker fleet liveness.
//!
//! A probe job is pushed through the [`JobQueue`] like any other job. If a
//! worker answers it within the timeout the fleet is alive; the headcount
//! then comes from recent worker heartbeats.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::job::{JobState, NewJob};
use crate::queue::{JobQueue, QueueError};
use crate::types::JobId;

/// Default time to wait for a probe answer.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default heartbeat window for counting workers.
pub const DEFAULT_LIVENESS_WINDOW: Duration = Duration::from_secs(60);

/// How often the probe job is re-polled.
const PROBE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStatus {
    pub live: bool,
    pub worker_count: u32,
}

impl FleetStatus {
    pub fn from_count(worker_count: u32) -> Self {
        Self {
            live: worker_count > 0,
            worker_count,
        }
    }

    pub fn server_type(&self) -> ServerType {
        if self.live {
            ServerType::Distributed
        } else {
            ServerType::Simple
        }
    }
}

/// Whether conversion is offered through the worker fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    Distributed,
    Simple,
}

pub struct FleetMonitor {
    queue: Arc<dyn JobQueue>,
    liveness_window: Duration,
}

impl FleetMonitor {
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self::with_window(queue, DEFAULT_LIVENESS_WINDOW)
    }

    pub fn with_window(queue: Arc<dyn JobQueue>, liveness_window: Duration) -> Self {
        Self {
            queue,
            liveness_window,
        }
    }

    /// Send a probe and wait up to `timeout` for any worker to answer.
    ///
    /// Returns `0` when nobody answers; that is not an error. Queue
    /// failures propagate as [`QueueError::Unavailable`].
    pub async fn probe_liveness(&self, timeout: Duration) -> Result<u32, QueueError> {
        let probe_id = self.queue.submit(NewJob::probe()).await?;
        let deadline = Instant::now() + timeout;

        loop {
            let view = self.queue.poll(probe_id).await?;
            match view.state {
                JobState::Success => return self.answered(probe_id).await,
                JobState::Failure => {
                    tracing::warn!(probe_id = %probe_id, error = ?view.error, "Probe failed");
                    return Ok(0);
                }
                _ => {}
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(PROBE_POLL_INTERVAL.min(deadline - now)).await;
        }

        // Keep a late-waking worker from answering a probe nobody awaits.
        if !self.queue.fail(probe_id, "probe timed out").await? {
            // Already terminal: a worker answered after the last poll.
            let view = self.queue.poll(probe_id).await?;
            if view.state == JobState::Success {
                return self.answered(probe_id).await;
            }
        }
        tracing::info!(probe_id = %probe_id, timeout_ms = timeout.as_millis() as u64, "No worker answered probe");
        Ok(0)
    }

    async fn answered(&self, probe_id: JobId) -> Result<u32, QueueError> {
        let seen = self.queue.count_live_workers(self.liveness_window).await?;
        let count = seen.max(1);
        tracing::debug!(probe_id = %probe_id, worker_count = count, "Probe answered");
        Ok(count)
    }

    pub async fn status(&self, timeout: Duration) -> Result<FleetStatus, QueueError> {
        let count = self.probe_liveness(timeout).await?;
        Ok(FleetStatus::from_count(count))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
