//! Durable [`JobQueue`] on Postgres.

use std::time::Duration;

use async_trait::async_trait;
use docflow_core::conversion::JobResult;
use docflow_core::job::{ClaimedJob, JobProgress, JobState, JobView, NewJob};
use docflow_core::queue::{JobQueue, QueueError, DEFAULT_LEASE};
use docflow_core::types::{JobId, Timestamp};

use crate::models::status::JobStatus;
use crate::repositories::{JobRepo, WorkerRepo};
use crate::DbPool;

/// Map a driver error to the queue taxonomy. Every failure that reaches
/// here means the backend could not serve the request.
fn unavailable(e: sqlx::Error) -> QueueError {
    QueueError::Unavailable(e.to_string())
}

#[derive(Clone)]
pub struct PgJobQueue {
    pool: DbPool,
    lease: Duration,
}

impl PgJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self::with_lease(pool, DEFAULT_LEASE)
    }

    pub fn with_lease(pool: DbPool, lease: Duration) -> Self {
        Self { pool, lease }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Explain why a guarded update matched no row.
    async fn current_state(&self, id: JobId) -> Result<JobState, QueueError> {
        let status_id = JobRepo::status_of(&self.pool, id)
            .await
            .map_err(unavailable)?
            .ok_or(QueueError::NotFound(id))?;
        JobStatus::from_id(status_id)
            .map(JobState::from)
            .ok_or_else(|| QueueError::Corrupt(format!("unknown status id {status_id} on job {id}")))
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn submit(&self, job: NewJob) -> Result<JobId, QueueError> {
        job.validate()?;

        let id = JobId::new_v4();
        JobRepo::insert(&self.pool, id, job.kind, &job.documents)
            .await
            .map_err(unavailable)?;

        tracing::debug!(job_id = %id, kind = %job.kind, documents = job.documents.len(), "Job submitted");
        Ok(id)
    }

    async fn poll(&self, id: JobId) -> Result<JobView, QueueError> {
        let row = JobRepo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable)?
            .ok_or(QueueError::NotFound(id))?;
        row.into_view().map_err(QueueError::Corrupt)
    }

    async fn claim_next(&self, worker: &str) -> Result<Option<ClaimedJob>, QueueError> {
        let Some(row) = JobRepo::claim_next(&self.pool, worker, self.lease.as_secs_f64())
            .await
            .map_err(unavailable)?
        else {
            return Ok(None);
        };

        let documents = JobRepo::documents(&self.pool, row.id)
            .await
            .map_err(unavailable)?;
        let claimed = row.into_claimed(documents).map_err(QueueError::Corrupt)?;

        tracing::debug!(
            job_id = %claimed.id,
            worker,
            delivery = claimed.delivery,
            "Job claimed",
        );
        Ok(Some(claimed))
    }

    async fn mark_running(&self, id: JobId, worker: &str) -> Result<bool, QueueError> {
        if JobRepo::mark_running(&self.pool, id, worker)
            .await
            .map_err(unavailable)?
        {
            return Ok(true);
        }
        // Already running is a re-delivery; terminal means skip.
        Ok(!self.current_state(id).await?.is_terminal())
    }

    async fn publish_progress(&self, id: JobId, progress: JobProgress) -> Result<(), QueueError> {
        let current = i32::try_from(progress.current).unwrap_or(i32::MAX);
        let total = i32::try_from(progress.total).unwrap_or(i32::MAX);

        if JobRepo::update_progress(&self.pool, id, current, total)
            .await
            .map_err(unavailable)?
        {
            return Ok(());
        }
        let from = self.current_state(id).await?;
        Err(QueueError::InvalidTransition {
            id,
            from,
            to: JobState::Progress,
        })
    }

    async fn complete(&self, id: JobId, result: JobResult) -> Result<bool, QueueError> {
        let value = serde_json::to_value(&result)
            .map_err(|e| QueueError::Corrupt(format!("unencodable result for job {id}: {e}")))?;

        if JobRepo::complete(&self.pool, id, &value)
            .await
            .map_err(unavailable)?
        {
            return Ok(true);
        }
        match self.current_state(id).await? {
            state if state.is_terminal() => Ok(false),
            from => Err(QueueError::InvalidTransition {
                id,
                from,
                to: JobState::Success,
            }),
        }
    }

    async fn fail(&self, id: JobId, message: &str) -> Result<bool, QueueError> {
        if JobRepo::fail(&self.pool, id, message)
            .await
            .map_err(unavailable)?
        {
            return Ok(true);
        }
        // Surfaces NotFound for unknown ids.
        self.current_state(id).await?;
        Ok(false)
    }

    async fn record_heartbeat(&self, worker: &str) -> Result<(), QueueError> {
        WorkerRepo::record_heartbeat(&self.pool, worker)
            .await
            .map_err(unavailable)?;
        JobRepo::touch_for_worker(&self.pool, worker)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn count_live_workers(&self, window: Duration) -> Result<u32, QueueError> {
        let count = WorkerRepo::count_live(&self.pool, window.as_secs_f64())
            .await
            .map_err(unavailable)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn evict_expired(&self, older_than: Timestamp) -> Result<u64, QueueError> {
        JobRepo::delete_completed_before(&self.pool, older_than)
            .await
            .map_err(unavailable)
    }
}
