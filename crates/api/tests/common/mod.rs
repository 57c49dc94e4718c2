#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use docflow_api::config::ServerConfig;
use docflow_api::dispatch::Dispatcher;
use docflow_api::router::build_app_router;
use docflow_api::state::AppState;
use docflow_core::conversion::{ConversionOutcome, JobResult, Metadata};
use docflow_core::job::JobKind;
use docflow_core::queue::{JobQueue, MemoryJobQueue};
use docflow_sync::FileSyncer;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const BOUNDARY: &str = "docflow-test-boundary";

/// A test `ServerConfig` with short waits.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        sync_timeout: Duration::from_secs(30),
        max_upload_bytes: 10 * 1024 * 1024,
        probe_timeout: Duration::from_millis(200),
        convert_wait: Duration::from_millis(300),
        job_retention: Duration::from_secs(3600),
        job_lease: Duration::from_secs(600),
        liveness_window: Duration::from_secs(60),
    }
}

/// Build the full application router over an in-memory queue.
pub fn build_test_app(
    queue: Arc<MemoryJobQueue>,
    conversion_enabled: bool,
    syncer: Option<Arc<FileSyncer>>,
) -> Router {
    build_test_app_with(test_config(), queue, conversion_enabled, syncer)
}

/// Like [`build_test_app`] with a caller-supplied config.
pub fn build_test_app_with(
    config: ServerConfig,
    queue: Arc<MemoryJobQueue>,
    conversion_enabled: bool,
    syncer: Option<Arc<FileSyncer>>,
) -> Router {
    let dispatcher = Arc::new(Dispatcher::new(
        queue,
        config.liveness_window,
        config.probe_timeout,
    ));
    let state = AppState {
        dispatcher,
        config: Arc::new(config.clone()),
        syncer,
    };
    build_app_router(state, &config, conversion_enabled)
}

/// Claim and finish jobs like a worker would, until the handle is aborted.
/// Documents convert to `# <filename>`.
pub fn spawn_fake_worker(queue: Arc<MemoryJobQueue>, name: &'static str) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            queue.record_heartbeat(name).await.unwrap();
            if let Some(job) = queue.claim_next(name).await.unwrap() {
                queue.mark_running(job.id, name).await.unwrap();
                let ok = |filename: &str| {
                    ConversionOutcome::ok(filename, format!("# {filename}"), &BTreeMap::new(), Metadata::new())
                };
                let result = match job.kind {
                    JobKind::Probe => JobResult::Probe { worker: name.into() },
                    JobKind::Single => JobResult::Single {
                        outcome: ok(&job.documents[0].filename),
                    },
                    JobKind::Batch => JobResult::Batch {
                        outcomes: job.documents.iter().map(|d| ok(&d.filename)).collect(),
                    },
                };
                queue.complete(job.id, result).await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
}

/// Build a multipart body with one file part per `(field, filename, bytes)`.
pub fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[(&str, &str, &[u8])]) -> Response<Body> {
    let request = Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
