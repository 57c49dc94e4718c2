//! Execution of one delivered job.

use std::sync::Arc;
use std::time::Duration;

use docflow_core::conversion::JobResult;
use docflow_core::error::CoreError;
use docflow_core::job::{ClaimedJob, JobKind};
use docflow_core::queue::{JobQueue, QueueError};

use crate::batch::run_batch;
use crate::error::WorkerError;
use crate::persist::OutputWriter;
use crate::pipeline::{DocumentPipeline, ProcessDocument};
use crate::pool::WorkerPool;

/// What happened to a delivered job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobDisposition {
    /// Already terminal when delivered; nothing ran.
    Skipped,
    Succeeded,
    /// Aborted by an infrastructure failure, recorded on the job.
    Failed(String),
}

pub struct JobExecutor {
    queue: Arc<dyn JobQueue>,
    pool: Arc<WorkerPool>,
    output: Option<Arc<OutputWriter>>,
    worker_name: String,
    convert_timeout: Duration,
}

impl JobExecutor {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        pool: Arc<WorkerPool>,
        output: Option<OutputWriter>,
        worker_name: impl Into<String>,
        convert_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            pool,
            output: output.map(Arc::new),
            worker_name: worker_name.into(),
            convert_timeout,
        }
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    /// Run a delivered job to a terminal state.
    ///
    /// Checks the stored state first so a re-delivered job that already
    /// finished is not run again. Infrastructure failures are recorded as
    /// job failure; only an unreachable queue is returned as an error,
    /// since nothing can be recorded then.
    pub async fn run_job(&self, job: ClaimedJob) -> Result<JobDisposition, WorkerError> {
        if !self.queue.mark_running(job.id, &self.worker_name).await? {
            tracing::debug!(job_id = %job.id, delivery = job.delivery, "Job already finished, skipping");
            return Ok(JobDisposition::Skipped);
        }
        tracing::info!(
            job_id = %job.id,
            kind = %job.kind,
            documents = job.documents.len(),
            delivery = job.delivery,
            "Job started",
        );

        match self.execute(&job).await {
            Ok(result) => {
                if self.queue.complete(job.id, result).await? {
                    tracing::info!(job_id = %job.id, "Job succeeded");
                    Ok(JobDisposition::Succeeded)
                } else {
                    tracing::debug!(job_id = %job.id, "Job finished elsewhere first");
                    Ok(JobDisposition::Skipped)
                }
            }
            Err(WorkerError::Queue(e @ QueueError::Unavailable(_))) => Err(e.into()),
            Err(e) => {
                let message = e.to_string();
                tracing::error!(job_id = %job.id, error = %message, "Job failed");
                self.queue.fail(job.id, &message).await?;
                Ok(JobDisposition::Failed(message))
            }
        }
    }

    async fn execute(&self, job: &ClaimedJob) -> Result<JobResult, WorkerError> {
        match job.kind {
            // Answered without touching the models.
            JobKind::Probe => Ok(JobResult::Probe {
                worker: self.worker_name.clone(),
            }),
            JobKind::Single => {
                let document = job.documents.first().ok_or_else(|| {
                    CoreError::Validation(format!("Single job {} has no document", job.id))
                })?;
                let pipeline = self.pipeline().await?;
                let outcome = pipeline.process(document).await?;
                Ok(JobResult::Single { outcome })
            }
            JobKind::Batch => {
                let pipeline = self.pipeline().await?;
                let outcomes =
                    run_batch(self.queue.as_ref(), job.id, &job.documents, &pipeline).await?;
                Ok(JobResult::Batch { outcomes })
            }
        }
    }

    async fn pipeline(&self) -> Result<DocumentPipeline, WorkerError> {
        let state = self.pool.ensure_initialized().await?;
        Ok(DocumentPipeline::new(
            state,
            self.output.clone(),
            self.convert_timeout,
        ))
    }
}
