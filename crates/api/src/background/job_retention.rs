//! Periodic eviction of finished jobs.
//!
//! Terminal jobs older than the retention window are deleted together with
//! their documents. Polling an evicted job reports it as not found.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use docflow_core::queue::{cutoff, JobQueue};
use tokio_util::sync::CancellationToken;

/// How often the eviction runs.
pub const EVICTION_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    queue: Arc<dyn JobQueue>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_hours = retention.as_secs() / 3600,
        interval_secs = interval.as_secs(),
        "Job retention started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention stopping");
                break;
            }
            _ = ticker.tick() => {
                match queue.evict_expired(cutoff(Utc::now(), retention)).await {
                    Ok(0) => tracing::debug!("Job retention: nothing to evict"),
                    Ok(evicted) => tracing::info!(evicted, "Job retention: evicted finished jobs"),
                    Err(e) => tracing::error!(error = %e, "Job retention: eviction failed"),
                }
            }
        }
    }
}
