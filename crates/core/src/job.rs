//! Job model and lifecycle state machine.
//!
//! A job moves monotonically through
//! `pending -> running -> progress* -> {success | failure}`. Terminal
//! states never revert; every queue backend enforces this through
//! [`JobState::can_transition_to`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conversion::JobResult;
use crate::error::CoreError;
use crate::types::JobId;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What a job asks a worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Convert exactly one document.
    Single,
    /// Convert an ordered list of documents sequentially.
    Batch,
    /// Answer immediately; used only to detect live workers.
    Probe,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Single => "single",
            JobKind::Batch => "batch",
            JobKind::Probe => "probe",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a job as observed by pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Progress,
    Success,
    Failure,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Progress => "progress",
            JobState::Success => "success",
            JobState::Failure => "failure",
        }
    }

    /// `true` for `success` and `failure`.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failure)
    }

    /// Whether `self -> next` is a legal forward move.
    ///
    /// `progress -> progress` is allowed (repeated progress updates).
    /// A job may fail from any non-terminal state, including `pending`
    /// (an unanswered probe is failed before any worker claims it).
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Success | Failure, _) => false,
            (_, Failure) => true,
            (Pending, Running) => true,
            (Running | Progress, Progress) => true,
            (Running | Progress, Success) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Documents completed out of documents submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub current: u32,
    pub total: u32,
}

impl JobProgress {
    pub fn new(current: u32, total: u32) -> Self {
        Self { current, total }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// One submitted document: its client-side filename and raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("filename", &self.filename)
            .field("bytes", &self.content.len())
            .finish()
    }
}

/// A submission accepted by [`JobQueue::submit`](crate::queue::JobQueue::submit).
#[derive(Debug, Clone)]
pub struct NewJob {
    pub kind: JobKind,
    pub documents: Vec<Document>,
}

impl NewJob {
    pub fn single(document: Document) -> Self {
        Self {
            kind: JobKind::Single,
            documents: vec![document],
        }
    }

    pub fn batch(documents: Vec<Document>) -> Self {
        Self {
            kind: JobKind::Batch,
            documents,
        }
    }

    pub fn probe() -> Self {
        Self {
            kind: JobKind::Probe,
            documents: Vec::new(),
        }
    }

    /// Check the payload shape against the job kind.
    ///
    /// - `single` carries exactly one document.
    /// - `probe` carries none.
    /// - `batch` carries any number (an empty batch completes immediately).
    /// - Every filename is non-blank.
    pub fn validate(&self) -> Result<(), CoreError> {
        match (self.kind, self.documents.len()) {
            (JobKind::Single, 1) | (JobKind::Batch, _) | (JobKind::Probe, 0) => {}
            (JobKind::Single, n) => {
                return Err(CoreError::Validation(format!(
                    "A single job carries exactly one document, got {n}"
                )))
            }
            (JobKind::Probe, n) => {
                return Err(CoreError::Validation(format!(
                    "A probe job carries no documents, got {n}"
                )))
            }
        }

        if let Some(i) = self
            .documents
            .iter()
            .position(|d| d.filename.trim().is_empty())
        {
            return Err(CoreError::Validation(format!(
                "Document at index {i} has an empty filename"
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Read-only projection of a job returned to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub id: JobId,
    pub kind: JobKind,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A job handed to a worker by [`JobQueue::claim_next`](crate::queue::JobQueue::claim_next).
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: JobId,
    pub kind: JobKind,
    pub documents: Vec<Document>,
    /// How many times this job has been delivered, including this one.
    pub delivery: u32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // -- transitions ---------------------------------------------------------

    #[test]
    fn forward_path_is_legal() {
        assert!(JobState::Pending.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Progress));
        assert!(JobState::Progress.can_transition_to(JobState::Progress));
        assert!(JobState::Progress.can_transition_to(JobState::Success));
        assert!(JobState::Running.can_transition_to(JobState::Success));
    }

    #[test]
    fn terminal_states_never_revert() {
        for terminal in [JobState::Success, JobState::Failure] {
            for next in [
                JobState::Pending,
                JobState::Running,
                JobState::Progress,
                JobState::Success,
                JobState::Failure,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn backwards_moves_rejected() {
        assert!(!JobState::Running.can_transition_to(JobState::Pending));
        assert!(!JobState::Progress.can_transition_to(JobState::Running));
        assert!(!JobState::Pending.can_transition_to(JobState::Success));
    }

    #[test]
    fn failure_reachable_from_any_live_state() {
        assert!(JobState::Pending.can_transition_to(JobState::Failure));
        assert!(JobState::Running.can_transition_to(JobState::Failure));
        assert!(JobState::Progress.can_transition_to(JobState::Failure));
    }

    // -- validation ----------------------------------------------------------

    #[test]
    fn single_requires_exactly_one_document() {
        let job = NewJob {
            kind: JobKind::Single,
            documents: vec![],
        };
        assert_matches!(job.validate(), Err(CoreError::Validation(_)));

        let job = NewJob::single(Document::new("a.pdf", b"x".to_vec()));
        assert!(job.validate().is_ok());
    }

    #[test]
    fn probe_rejects_documents() {
        let job = NewJob {
            kind: JobKind::Probe,
            documents: vec![Document::new("a.pdf", Vec::new())],
        };
        assert!(job.validate().is_err());
        assert!(NewJob::probe().validate().is_ok());
    }

    #[test]
    fn empty_batch_is_valid() {
        assert!(NewJob::batch(Vec::new()).validate().is_ok());
    }

    #[test]
    fn blank_filename_rejected() {
        let job = NewJob::batch(vec![
            Document::new("a.pdf", Vec::new()),
            Document::new("  ", Vec::new()),
        ]);
        assert_matches!(job.validate(), Err(CoreError::Validation(msg)) if msg.contains("index 1"));
    }

    // -- serde ---------------------------------------------------------------

    #[test]
    fn states_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(JobState::Progress).unwrap(),
            serde_json::json!("progress")
        );
        assert_eq!(
            serde_json::to_value(JobKind::Batch).unwrap(),
            serde_json::json!("batch")
        );
    }

    #[test]
    fn document_debug_hides_bytes() {
        let doc = Document::new("a.pdf", vec![0u8; 2048]);
        let rendered = format!("{doc:?}");
        assert!(rendered.contains("bytes: 2048"));
        assert!(!rendered.contains("[0, 0"));
    }
}
