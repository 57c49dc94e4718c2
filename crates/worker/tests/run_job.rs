use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use docflow_core::conversion::{decode_image, JobResult, Metadata, OutcomeStatus};
use docflow_core::job::{Document, JobProgress, JobState, NewJob};
use docflow_core::queue::{JobQueue, MemoryJobQueue};
use docflow_worker::converter::{ConvertError, Converted, Converter, ModelLoader};
use docflow_worker::error::WorkerError;
use docflow_worker::persist::OutputWriter;
use docflow_worker::pool::WorkerPool;
use docflow_worker::runner::WorkerRunner;
use docflow_worker::task::{JobDisposition, JobExecutor};
use serde_json::json;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Produces one image and a `title` key. Rejects documents starting with
/// `bad`, stalls on `slow`, reports itself unreachable on `down` and names
/// its image `..` for `odd`.
#[derive(Default)]
struct FakeConverter {
    calls: AtomicUsize,
}

#[async_trait]
impl Converter for FakeConverter {
    async fn convert(
        &self,
        filename: &str,
        bytes: &[u8],
        _hint: &Metadata,
    ) -> Result<Converted, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if filename.starts_with("bad") {
            return Err(ConvertError::Failed("corrupt xref table".into()));
        }
        if filename.starts_with("down") {
            return Err(ConvertError::Transport("connection refused".into()));
        }
        if filename.starts_with("slow") {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }

        let image_name = if filename.starts_with("odd") { ".." } else { "fig_1.png" };
        let mut images = BTreeMap::new();
        images.insert(image_name.to_string(), bytes.to_vec());
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!("From model"));
        metadata.insert("pages".into(), json!(1));
        Ok(Converted {
            text: format!("# {filename}"),
            images,
            metadata,
        })
    }
}

struct FakeLoader {
    converter: Arc<FakeConverter>,
    loads: AtomicUsize,
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(&self) -> Result<Arc<dyn Converter>, WorkerError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.converter.clone())
    }
}

struct Harness {
    queue: Arc<MemoryJobQueue>,
    converter: Arc<FakeConverter>,
    loader: Arc<FakeLoader>,
    executor: Arc<JobExecutor>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(output: Option<OutputWriter>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let meta_path = dir.path().join("metadata_template.json");
        std::fs::write(
            &meta_path,
            json!({"a.pdf": {"title": "Certificate", "owner": "ops"}}).to_string(),
        )
        .unwrap();

        let queue = Arc::new(MemoryJobQueue::new());
        let converter = Arc::new(FakeConverter::default());
        let loader = Arc::new(FakeLoader {
            converter: converter.clone(),
            loads: AtomicUsize::new(0),
        });
        let pool = Arc::new(WorkerPool::new(loader.clone(), meta_path));
        let executor = Arc::new(JobExecutor::new(
            queue.clone(),
            pool,
            output,
            "test-worker",
            Duration::from_millis(200),
        ));
        Self {
            queue,
            converter,
            loader,
            executor,
            _dir: dir,
        }
    }

    async fn submit_and_run(&self, job: NewJob) -> (docflow_core::types::JobId, JobDisposition) {
        let id = self.queue.submit(job).await.unwrap();
        let claimed = self.queue.claim_next("test-worker").await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        (id, self.executor.run_job(claimed).await.unwrap())
    }
}

fn doc(name: &str) -> Document {
    Document::new(name, name.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Single documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_job_merges_external_metadata_over_computed() {
    let h = Harness::new(None);
    let (id, disposition) = h.submit_and_run(NewJob::single(doc("a.pdf"))).await;
    assert_eq!(disposition, JobDisposition::Succeeded);

    let view = h.queue.poll(id).await.unwrap();
    assert_eq!(view.state, JobState::Success);
    let outcome = assert_matches!(view.result, Some(JobResult::Single { outcome }) => outcome);
    assert_eq!(outcome.status, OutcomeStatus::Ok);
    assert_eq!(outcome.text.as_deref(), Some("# a.pdf"));
    assert_eq!(outcome.metadata["title"], "Certificate");
    assert_eq!(outcome.metadata["owner"], "ops");
    assert_eq!(outcome.metadata["pages"], 1);
    assert_eq!(decode_image(&outcome.images["fig_1.png"]).unwrap(), b"a.pdf");
}

#[tokio::test]
async fn convert_failure_becomes_error_outcome() {
    let h = Harness::new(None);
    let (id, disposition) = h.submit_and_run(NewJob::single(doc("bad.pdf"))).await;
    assert_eq!(disposition, JobDisposition::Succeeded);

    let view = h.queue.poll(id).await.unwrap();
    let outcome = assert_matches!(view.result, Some(JobResult::Single { outcome }) => outcome);
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.error.as_deref(), Some("corrupt xref table"));
    assert!(outcome.text.is_none());
}

#[tokio::test]
async fn slow_conversion_times_out_as_error_outcome() {
    let h = Harness::new(None);
    let (id, _) = h.submit_and_run(NewJob::single(doc("slow.pdf"))).await;

    let view = h.queue.poll(id).await.unwrap();
    let outcome = assert_matches!(view.result, Some(JobResult::Single { outcome }) => outcome);
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert!(outcome.error.unwrap().contains("timed out"));
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_with_one_corrupt_document() {
    let h = Harness::new(None);
    let (id, _) = h
        .submit_and_run(NewJob::batch(vec![doc("a.pdf"), doc("bad.pdf")]))
        .await;

    let view = h.queue.poll(id).await.unwrap();
    assert_eq!(view.state, JobState::Success);
    assert_eq!(view.progress, Some(JobProgress::new(2, 2)));

    let outcomes = assert_matches!(view.result, Some(JobResult::Batch { outcomes }) => outcomes);
    let statuses: Vec<_> = outcomes.iter().map(|o| (o.filename.as_str(), o.status)).collect();
    assert_eq!(
        statuses,
        vec![("a.pdf", OutcomeStatus::Ok), ("bad.pdf", OutcomeStatus::Error)]
    );
}

#[tokio::test]
async fn unreachable_converter_fails_whole_batch() {
    let h = Harness::new(None);
    let (id, disposition) = h
        .submit_and_run(NewJob::batch(vec![doc("a.pdf"), doc("down.pdf"), doc("c.pdf")]))
        .await;

    let reason = assert_matches!(disposition, JobDisposition::Failed(reason) => reason);
    assert!(reason.contains("connection refused"));
    let view = h.queue.poll(id).await.unwrap();
    assert_eq!(view.state, JobState::Failure);
    assert!(view.result.is_none());
    // Nothing after the unreachable document is attempted.
    assert_eq!(h.converter.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_batch_succeeds_with_no_outcomes() {
    let h = Harness::new(None);
    let (id, _) = h.submit_and_run(NewJob::batch(Vec::new())).await;

    let view = h.queue.poll(id).await.unwrap();
    assert_eq!(view.state, JobState::Success);
    assert_eq!(view.progress, Some(JobProgress::new(0, 0)));
    assert_eq!(view.result, Some(JobResult::Batch { outcomes: vec![] }));
}

// ---------------------------------------------------------------------------
// Delivery semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redelivered_completed_job_is_not_rerun() {
    let h = Harness::new(None);
    let id = h.queue.submit(NewJob::single(doc("a.pdf"))).await.unwrap();
    let claimed = h.queue.claim_next("test-worker").await.unwrap().unwrap();

    let first = h.executor.run_job(claimed.clone()).await.unwrap();
    let before = h.queue.poll(id).await.unwrap();
    let second = h.executor.run_job(claimed).await.unwrap();

    assert_eq!(first, JobDisposition::Succeeded);
    assert_eq!(second, JobDisposition::Skipped);
    assert_eq!(h.converter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.queue.poll(id).await.unwrap(), before);
}

#[tokio::test]
async fn probe_answers_without_loading_models() {
    let h = Harness::new(None);
    let (id, _) = h.submit_and_run(NewJob::probe()).await;

    let view = h.queue.poll(id).await.unwrap();
    assert_eq!(
        view.result,
        Some(JobResult::Probe {
            worker: "test-worker".into()
        })
    );
    assert_eq!(h.loader.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn models_load_once_across_jobs() {
    let h = Harness::new(None);
    h.submit_and_run(NewJob::single(doc("a.pdf"))).await;
    h.submit_and_run(NewJob::batch(vec![doc("b.pdf"), doc("c.pdf")]))
        .await;
    assert_eq!(h.loader.loads.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn output_is_persisted_per_document() {
    let out = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(OutputWriter::new(out.path())));
    h.submit_and_run(NewJob::batch(vec![doc("a.pdf"), doc("bad.pdf")]))
        .await;

    let folder = out.path().join("a");
    assert_eq!(std::fs::read_to_string(folder.join("a.md")).unwrap(), "# a.pdf");
    assert_eq!(std::fs::read(folder.join("fig_1.png")).unwrap(), b"a.pdf");
    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(folder.join("a_meta.json")).unwrap()).unwrap();
    assert_eq!(meta["title"], "Certificate");
    // Failed conversions leave nothing behind.
    assert!(!out.path().join("bad").exists());
}

#[tokio::test]
async fn dotted_filename_is_persisted_alongside_siblings() {
    let out = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(OutputWriter::new(out.path())));
    let (id, disposition) = h
        .submit_and_run(NewJob::batch(vec![
            doc("a.pdf"),
            doc("Q1..Q2 report.pdf"),
            doc("c.pdf"),
        ]))
        .await;

    assert_eq!(disposition, JobDisposition::Succeeded);
    let view = h.queue.poll(id).await.unwrap();
    assert_eq!(view.state, JobState::Success);
    let outcomes = assert_matches!(view.result, Some(JobResult::Batch { outcomes }) => outcomes);
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Ok));

    let folder = out.path().join("Q1..Q2 report");
    assert_eq!(
        std::fs::read_to_string(folder.join("Q1..Q2 report.md")).unwrap(),
        "# Q1..Q2 report.pdf"
    );
}

#[tokio::test]
async fn unsafe_image_name_fails_only_that_document() {
    let out = tempfile::tempdir().unwrap();
    let h = Harness::new(Some(OutputWriter::new(out.path())));
    let (id, disposition) = h
        .submit_and_run(NewJob::batch(vec![doc("a.pdf"), doc("odd.pdf"), doc("c.pdf")]))
        .await;

    assert_eq!(disposition, JobDisposition::Succeeded);
    let view = h.queue.poll(id).await.unwrap();
    let outcomes = assert_matches!(view.result, Some(JobResult::Batch { outcomes }) => outcomes);
    let statuses: Vec<_> = outcomes.iter().map(|o| (o.filename.as_str(), o.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("a.pdf", OutcomeStatus::Ok),
            ("odd.pdf", OutcomeStatus::Error),
            ("c.pdf", OutcomeStatus::Ok),
        ]
    );
    assert!(outcomes[1].error.as_deref().unwrap().contains("'..'"));
    assert!(!out.path().join("odd").exists());
    assert!(out.path().join("c").join("c.md").exists());
}

#[tokio::test]
async fn write_failure_fails_job_without_partial_result() {
    let out = tempfile::tempdir().unwrap();
    // A regular file where the output root should be a directory.
    let blocked = out.path().join("not-a-dir");
    std::fs::write(&blocked, b"").unwrap();
    let h = Harness::new(Some(OutputWriter::new(&blocked)));

    let (id, disposition) = h
        .submit_and_run(NewJob::batch(vec![doc("a.pdf"), doc("b.pdf")]))
        .await;

    assert_matches!(disposition, JobDisposition::Failed(_));
    let view = h.queue.poll(id).await.unwrap();
    assert_eq!(view.state, JobState::Failure);
    assert!(view.result.is_none());
    assert!(view.error.is_some());
}

// ---------------------------------------------------------------------------
// Claim loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn runner_drains_queue_and_heartbeats() {
    let h = Harness::new(None);
    let a = h.queue.submit(NewJob::single(doc("a.pdf"))).await.unwrap();
    let b = h.queue.submit(NewJob::single(doc("b.pdf"))).await.unwrap();

    let runner = WorkerRunner::new(h.queue.clone(), h.executor.clone())
        .with_poll_interval(Duration::from_millis(20));
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { runner.run(cancel).await })
    };

    for _ in 0..100 {
        let done_a = h.queue.poll(a).await.unwrap().state.is_terminal();
        let done_b = h.queue.poll(b).await.unwrap().state.is_terminal();
        if done_a && done_b {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(h.queue.poll(a).await.unwrap().state, JobState::Success);
    assert_eq!(h.queue.poll(b).await.unwrap().state, JobState::Success);
    assert_eq!(
        h.queue
            .count_live_workers(Duration::from_secs(60))
            .await
            .unwrap(),
        1
    );
}
