//! Sequential execution of a multi-document job with progress reporting.

use docflow_core::conversion::ConversionOutcome;
use docflow_core::job::{Document, JobProgress};
use docflow_core::queue::JobQueue;
use docflow_core::types::JobId;

use crate::error::WorkerError;
use crate::pipeline::ProcessDocument;

/// Convert `documents` one after another.
///
/// Publishes `(0, N)` before the first document and `(i, N)` after the
/// i-th, so pollers see the total immediately and `current` only grows.
/// Per-document failures are kept as error outcomes and the loop moves
/// on; an infrastructure error aborts the loop and is returned.
///
/// The returned outcomes match `documents` in length and order.
pub async fn run_batch(
    queue: &dyn JobQueue,
    job_id: JobId,
    documents: &[Document],
    processor: &dyn ProcessDocument,
) -> Result<Vec<ConversionOutcome>, WorkerError> {
    let total = documents.len() as u32;
    queue
        .publish_progress(job_id, JobProgress::new(0, total))
        .await?;
    tracing::info!(job_id = %job_id, total, "Batch started");

    let mut outcomes = Vec::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        let outcome = processor.process(document).await?;
        if !outcome.is_ok() {
            tracing::error!(
                job_id = %job_id,
                file = %document.filename,
                error = outcome.error.as_deref().unwrap_or_default(),
                "Batch item failed",
            );
        }
        outcomes.push(outcome);

        let current = index as u32 + 1;
        queue
            .publish_progress(job_id, JobProgress::new(current, total))
            .await?;
        tracing::debug!(job_id = %job_id, current, total, "Batch progress");
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    tracing::info!(job_id = %job_id, total, failed, "Batch finished");
    Ok(outcomes)
}
