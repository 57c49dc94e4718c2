//! Repository for the `jobs` and `job_documents` tables.
//!
//! Uses `JobStatus` and `JobKindId` from `models::status` for every status
//! literal. Conditional updates return `None` when the guard did not match
//! so callers can tell a missing job from an illegal transition.

use docflow_core::job::{Document, JobKind};
use docflow_core::types::{JobId, Timestamp};
use sqlx::PgPool;

use crate::models::job::{DocumentRow, JobRow};
use crate::models::status::{JobKindId, JobStatus, StatusId, LIVE_STATUSES};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, kind_id, status_id, progress_current, progress_total, \
    result, error_message, worker_name, deliveries, \
    submitted_at, claimed_at, started_at, completed_at, heartbeat_at";

/// Provides queue operations over the `jobs` table.
pub struct JobRepo;

impl JobRepo {
    // ── Submission ───────────────────────────────────────────────────────

    /// Insert a pending job and its documents in one transaction.
    pub async fn insert(
        pool: &PgPool,
        id: JobId,
        kind: JobKind,
        documents: &[Document],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("INSERT INTO jobs (id, kind_id, status_id) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(JobKindId::from(kind).id())
            .bind(JobStatus::Pending.id())
            .execute(&mut *tx)
            .await?;

        for (position, doc) in documents.iter().enumerate() {
            sqlx::query(
                "INSERT INTO job_documents (job_id, position, filename, content) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(position as i32)
            .bind(&doc.filename)
            .bind(&doc.content)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Current status id, or `None` if the job does not exist.
    pub async fn status_of(pool: &PgPool, id: JobId) -> Result<Option<StatusId>, sqlx::Error> {
        let row: Option<(StatusId,)> = sqlx::query_as("SELECT status_id FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|(status,)| status))
    }

    /// Documents of a job in submission order.
    pub async fn documents(pool: &PgPool, id: JobId) -> Result<Vec<DocumentRow>, sqlx::Error> {
        sqlx::query_as::<_, DocumentRow>(
            "SELECT position, filename, content FROM job_documents \
             WHERE job_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    // ── Claiming ─────────────────────────────────────────────────────────

    /// Atomically claim the next deliverable job for a worker.
    ///
    /// Deliverable means non-terminal and either unclaimed or with a
    /// heartbeat older than `lease_secs`. Probes sort first, then oldest.
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// receive the same row.
    pub async fn claim_next(
        pool: &PgPool,
        worker: &str,
        lease_secs: f64,
    ) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET worker_name = $1, claimed_at = NOW(), heartbeat_at = NOW(), \
                 deliveries = deliveries + 1 \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id = ANY($2) \
                   AND (worker_name IS NULL OR heartbeat_at IS NULL \
                        OR heartbeat_at < NOW() - make_interval(secs => $3)) \
                 ORDER BY (kind_id = $4) DESC, submitted_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(worker)
            .bind(&LIVE_STATUSES[..])
            .bind(lease_secs)
            .bind(JobKindId::Probe.id())
            .fetch_optional(pool)
            .await
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// `pending -> running`. Returns `false` if the job was not pending.
    pub async fn mark_running(pool: &PgPool, id: JobId, worker: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $3, worker_name = $2, started_at = NOW(), heartbeat_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(id)
        .bind(worker)
        .bind(JobStatus::Running.id())
        .bind(JobStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record progress on a running job. `progress_current` only grows.
    /// Returns `false` if the job was not running.
    pub async fn update_progress(
        pool: &PgPool,
        id: JobId,
        current: i32,
        total: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $4, \
                 progress_current = GREATEST(COALESCE(progress_current, 0), $2), \
                 progress_total = $3, heartbeat_at = NOW() \
             WHERE id = $1 AND status_id IN ($5, $4)",
        )
        .bind(id)
        .bind(current)
        .bind(total)
        .bind(JobStatus::Progress.id())
        .bind(JobStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a running job as succeeded with its result payload.
    /// Returns `false` if the job was not running.
    pub async fn complete(
        pool: &PgPool,
        id: JobId,
        result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE jobs \
             SET status_id = $3, result = $2, error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5)",
        )
        .bind(id)
        .bind(result)
        .bind(JobStatus::Success.id())
        .bind(JobStatus::Running.id())
        .bind(JobStatus::Progress.id())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Mark a non-terminal job as failed, clearing any partial result.
    /// Returns `false` if the job was already terminal or missing.
    pub async fn fail(pool: &PgPool, id: JobId, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $3, result = NULL, error_message = $2, completed_at = NOW() \
             WHERE id = $1 AND status_id = ANY($4)",
        )
        .bind(id)
        .bind(error)
        .bind(JobStatus::Failure.id())
        .bind(&LIVE_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refresh the lease of every non-terminal job held by `worker`.
    pub async fn touch_for_worker(pool: &PgPool, worker: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET heartbeat_at = NOW() \
             WHERE worker_name = $1 AND status_id = ANY($2)",
        )
        .bind(worker)
        .bind(&LIVE_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ── Retention ────────────────────────────────────────────────────────

    /// Delete terminal jobs completed before `cutoff`. Documents cascade.
    pub async fn delete_completed_before(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM jobs \
             WHERE status_id IN ($2, $3) AND completed_at < $1",
        )
        .bind(cutoff)
        .bind(JobStatus::Success.id())
        .bind(JobStatus::Failure.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
