//! Postgres persistence for the conversion job queue.
//!
//! [`PgJobQueue`] implements [`docflow_core::queue::JobQueue`] on top of
//! the `jobs`, `job_documents` and `workers` tables.

pub mod models;
pub mod queue;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;

pub use queue::PgJobQueue;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
