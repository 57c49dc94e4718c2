//! Repository for the `workers` table.

use sqlx::PgPool;

/// Records worker heartbeats and counts recently seen workers.
pub struct WorkerRepo;

impl WorkerRepo {
    /// Register the worker on first sight, otherwise bump its heartbeat.
    pub async fn record_heartbeat(pool: &PgPool, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO workers (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET last_heartbeat_at = NOW()",
        )
        .bind(name)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Count workers whose last heartbeat is within `window_secs` of now.
    pub async fn count_live(pool: &PgPool, window_secs: f64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM workers \
             WHERE last_heartbeat_at >= NOW() - make_interval(secs => $1)",
        )
        .bind(window_secs)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
