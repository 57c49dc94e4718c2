//! Row structs for the `jobs` and `job_documents` tables.

use docflow_core::conversion::JobResult;
use docflow_core::job::{ClaimedJob, Document, JobKind, JobProgress, JobState, JobView};
use docflow_core::types::{JobId, Timestamp};
use sqlx::FromRow;

use super::status::{JobKindId, JobStatus, StatusId};

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub kind_id: StatusId,
    pub status_id: StatusId,
    pub progress_current: Option<i32>,
    pub progress_total: Option<i32>,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub worker_name: Option<String>,
    pub deliveries: i32,
    pub submitted_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub heartbeat_at: Option<Timestamp>,
}

/// A row from the `job_documents` table.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub position: i32,
    pub filename: String,
    pub content: Vec<u8>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document::new(row.filename, row.content)
    }
}

impl JobRow {
    pub fn kind(&self) -> Result<JobKind, String> {
        JobKindId::from_id(self.kind_id)
            .map(JobKind::from)
            .ok_or_else(|| format!("unknown kind id {} on job {}", self.kind_id, self.id))
    }

    pub fn state(&self) -> Result<JobState, String> {
        JobStatus::from_id(self.status_id)
            .map(JobState::from)
            .ok_or_else(|| format!("unknown status id {} on job {}", self.status_id, self.id))
    }

    pub fn progress(&self) -> Option<JobProgress> {
        match (self.progress_current, self.progress_total) {
            (Some(current), Some(total)) => Some(JobProgress::new(
                u32::try_from(current).unwrap_or(0),
                u32::try_from(total).unwrap_or(0),
            )),
            _ => None,
        }
    }

    /// Project the row into the poller-facing view.
    pub fn into_view(self) -> Result<JobView, String> {
        let kind = self.kind()?;
        let state = self.state()?;
        let progress = self.progress();
        let result = self
            .result
            .map(serde_json::from_value::<JobResult>)
            .transpose()
            .map_err(|e| format!("undecodable result on job {}: {e}", self.id))?;

        Ok(JobView {
            id: self.id,
            kind,
            state,
            progress,
            result,
            error: self.error_message,
        })
    }

    /// Attach documents to a freshly claimed row.
    pub fn into_claimed(self, documents: Vec<DocumentRow>) -> Result<ClaimedJob, String> {
        Ok(ClaimedJob {
            id: self.id,
            kind: self.kind()?,
            documents: documents.into_iter().map(Document::from).collect(),
            delivery: u32::try_from(self.deliveries).unwrap_or(0),
        })
    }
}
