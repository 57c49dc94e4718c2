//! The job queue contract.
//!
//! A durable multi-consumer work queue plus a result store keyed by job
//! id. Submitters call [`JobQueue::submit`] and [`JobQueue::poll`];
//! workers call [`JobQueue::claim_next`] and drive the job through its
//! lifecycle. Delivery is at-least-once: a job whose lease lapses is handed
//! to another worker, which must check the stored state before re-running.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::conversion::JobResult;
use crate::error::CoreError;
use crate::job::{ClaimedJob, JobProgress, JobState, JobView, NewJob};
use crate::types::{JobId, Timestamp};

pub use memory::MemoryJobQueue;

/// Default lease: how long a claimed job may go without a heartbeat before
/// it is re-delivered.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The backend could not be reached. Callers may retry later.
    #[error("Queue backend unavailable: {0}")]
    Unavailable(String),

    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    /// A stored record could not be decoded.
    #[error("Stored job data is invalid: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Rejected(#[from] CoreError),
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Persist a job and its documents in state `pending`. Never waits for
    /// the job to run.
    async fn submit(&self, job: NewJob) -> Result<JobId, QueueError>;

    /// Current state, progress and result of a job.
    async fn poll(&self, id: JobId) -> Result<JobView, QueueError>;

    /// Atomically hand one deliverable job to `worker`.
    ///
    /// Deliverable means unclaimed and `pending`, or non-terminal with a
    /// lapsed lease. Probe jobs are handed out before conversion jobs;
    /// otherwise oldest first.
    async fn claim_next(&self, worker: &str) -> Result<Option<ClaimedJob>, QueueError>;

    /// `pending -> running`. A no-op returning `true` when the job is
    /// already running (re-delivery); returns `false` on terminal jobs.
    async fn mark_running(&self, id: JobId, worker: &str) -> Result<bool, QueueError>;

    /// Move to `progress`. `current` never decreases. Rejected with
    /// [`QueueError::InvalidTransition`] unless the job is running.
    async fn publish_progress(&self, id: JobId, progress: JobProgress) -> Result<(), QueueError>;

    /// Move to `success` with `result`. Returns `false` if the job was
    /// already terminal; the stored result is never overwritten.
    async fn complete(&self, id: JobId, result: JobResult) -> Result<bool, QueueError>;

    /// Move to `failure`, dropping any partial result. Returns `false` if
    /// the job was already terminal.
    async fn fail(&self, id: JobId, message: &str) -> Result<bool, QueueError>;

    /// Record that `worker` is alive and extend the lease of every
    /// non-terminal job it holds.
    async fn record_heartbeat(&self, worker: &str) -> Result<(), QueueError>;

    /// Number of workers that recorded a heartbeat within `window`.
    async fn count_live_workers(&self, window: Duration) -> Result<u32, QueueError>;

    /// Delete terminal jobs completed before `older_than`.
    async fn evict_expired(&self, older_than: Timestamp) -> Result<u64, QueueError>;
}

/// `now - window`, saturating at the earliest representable time.
pub fn cutoff(now: Timestamp, window: Duration) -> Timestamp {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC)
}

/// Fail with [`QueueError::InvalidTransition`] unless `from -> to` is legal.
pub fn ensure_transition(id: JobId, from: JobState, to: JobState) -> Result<(), QueueError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(QueueError::InvalidTransition { id, from, to })
    }
}
