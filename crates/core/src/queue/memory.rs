//! Single-process [`JobQueue`] backed by a mutex-guarded map.
//!
//! Shares the state machine and lease rules of the Postgres backend so
//! tests and embedded setups see the same behaviour. Nothing survives a
//! restart.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{cutoff, ensure_transition, JobQueue, QueueError, DEFAULT_LEASE};
use crate::conversion::JobResult;
use crate::job::{ClaimedJob, Document, JobKind, JobProgress, JobState, JobView, NewJob};
use crate::types::{JobId, Timestamp};

#[derive(Debug)]
struct JobRecord {
    id: JobId,
    kind: JobKind,
    state: JobState,
    documents: Vec<Document>,
    progress: Option<JobProgress>,
    result: Option<JobResult>,
    error: Option<String>,
    worker: Option<String>,
    deliveries: u32,
    seq: u64,
    completed_at: Option<Timestamp>,
    heartbeat_at: Option<Timestamp>,
}

impl JobRecord {
    fn view(&self) -> JobView {
        JobView {
            id: self.id,
            kind: self.kind,
            state: self.state,
            progress: self.progress,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }

    fn is_deliverable(&self, lease_cutoff: Timestamp) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match (&self.worker, self.heartbeat_at) {
            (None, _) => true,
            (Some(_), Some(beat)) => beat < lease_cutoff,
            (Some(_), None) => true,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, JobRecord>,
    workers: HashMap<String, Timestamp>,
    next_seq: u64,
}

impl Inner {
    fn job_mut(&mut self, id: JobId) -> Result<&mut JobRecord, QueueError> {
        self.jobs.get_mut(&id).ok_or(QueueError::NotFound(id))
    }
}

pub struct MemoryJobQueue {
    inner: Mutex<Inner>,
    lease: Duration,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::with_lease(DEFAULT_LEASE)
    }

    pub fn with_lease(lease: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            lease,
        }
    }

    /// Number of stored jobs, including terminal ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn submit(&self, job: NewJob) -> Result<JobId, QueueError> {
        job.validate()?;

        let mut inner = self.inner.lock().await;
        let id = JobId::new_v4();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(
            id,
            JobRecord {
                id,
                kind: job.kind,
                state: JobState::Pending,
                documents: job.documents,
                progress: None,
                result: None,
                error: None,
                worker: None,
                deliveries: 0,
                seq,
                completed_at: None,
                heartbeat_at: None,
            },
        );
        tracing::debug!(job_id = %id, kind = %job.kind, "Job submitted");
        Ok(id)
    }

    async fn poll(&self, id: JobId) -> Result<JobView, QueueError> {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .get(&id)
            .map(JobRecord::view)
            .ok_or(QueueError::NotFound(id))
    }

    async fn claim_next(&self, worker: &str) -> Result<Option<ClaimedJob>, QueueError> {
        let now = Utc::now();
        let lease_cutoff = cutoff(now, self.lease);
        let mut inner = self.inner.lock().await;

        let next = inner
            .jobs
            .values()
            .filter(|job| job.is_deliverable(lease_cutoff))
            .min_by_key(|job| (job.kind != JobKind::Probe, job.seq))
            .map(|job| job.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let job = inner.job_mut(id)?;
        job.worker = Some(worker.to_string());
        job.heartbeat_at = Some(now);
        job.deliveries += 1;

        Ok(Some(ClaimedJob {
            id,
            kind: job.kind,
            documents: job.documents.clone(),
            delivery: job.deliveries,
        }))
    }

    async fn mark_running(&self, id: JobId, worker: &str) -> Result<bool, QueueError> {
        let mut inner = self.inner.lock().await;
        let job = inner.job_mut(id)?;
        match job.state {
            JobState::Pending => {
                job.state = JobState::Running;
                job.worker = Some(worker.to_string());
                job.heartbeat_at = Some(Utc::now());
                Ok(true)
            }
            JobState::Running | JobState::Progress => Ok(true),
            JobState::Success | JobState::Failure => Ok(false),
        }
    }

    async fn publish_progress(&self, id: JobId, progress: JobProgress) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let job = inner.job_mut(id)?;
        ensure_transition(id, job.state, JobState::Progress)?;

        let current = job
            .progress
            .map_or(progress.current, |old| old.current.max(progress.current));
        job.progress = Some(JobProgress::new(current, progress.total));
        job.state = JobState::Progress;
        job.heartbeat_at = Some(Utc::now());
        Ok(())
    }

    async fn complete(&self, id: JobId, result: JobResult) -> Result<bool, QueueError> {
        let mut inner = self.inner.lock().await;
        let job = inner.job_mut(id)?;
        if job.state.is_terminal() {
            return Ok(false);
        }
        ensure_transition(id, job.state, JobState::Success)?;

        job.state = JobState::Success;
        job.result = Some(result);
        job.error = None;
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn fail(&self, id: JobId, message: &str) -> Result<bool, QueueError> {
        let mut inner = self.inner.lock().await;
        let job = inner.job_mut(id)?;
        if job.state.is_terminal() {
            return Ok(false);
        }

        job.state = JobState::Failure;
        job.result = None;
        job.error = Some(message.to_string());
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn record_heartbeat(&self, worker: &str) -> Result<(), QueueError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        inner.workers.insert(worker.to_string(), now);
        for job in inner.jobs.values_mut() {
            if !job.state.is_terminal() && job.worker.as_deref() == Some(worker) {
                job.heartbeat_at = Some(now);
            }
        }
        Ok(())
    }

    async fn count_live_workers(&self, window: Duration) -> Result<u32, QueueError> {
        let since = cutoff(Utc::now(), window);
        let inner = self.inner.lock().await;
        Ok(inner.workers.values().filter(|seen| **seen >= since).count() as u32)
    }

    async fn evict_expired(&self, older_than: Timestamp) -> Result<u64, QueueError> {
        let mut inner = self.inner.lock().await;
        let before = inner.jobs.len();
        inner.jobs.retain(|_, job| {
            !(job.state.is_terminal() && job.completed_at.is_some_and(|at| at < older_than))
        });
        Ok((before - inner.jobs.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
