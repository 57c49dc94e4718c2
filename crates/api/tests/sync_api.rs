//! Integration tests for `POST /sync`.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{body_json, post_empty};
use docflow_api::config::ServerConfig;
use docflow_core::queue::MemoryJobQueue;
use docflow_sync::{FileSyncer, RemoteEntry, RemoteError, RemoteStore, SyncPolicy};

/// Serves `a.pdf` and `b.pdf`, or refuses to list when `down`. Listing
/// takes `list_delay`.
struct StaticStore {
    down: bool,
    list_delay: Duration,
}

#[async_trait]
impl RemoteStore for StaticStore {
    async fn list(&self, _root: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        tokio::time::sleep(self.list_delay).await;
        if self.down {
            return Err(RemoteError::Status {
                status: 503,
                body: "maintenance".into(),
            });
        }
        Ok(["a.pdf", "b.pdf"]
            .into_iter()
            .map(|name| RemoteEntry {
                name: name.into(),
                size_bytes: None,
            })
            .collect())
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError> {
        tokio::fs::write(local_path, remote_path.as_bytes()).await?;
        Ok(remote_path.len() as u64)
    }
}

fn syncer(dest: &Path, down: bool) -> Arc<FileSyncer> {
    slow_syncer(dest, down, Duration::ZERO)
}

fn slow_syncer(dest: &Path, down: bool, list_delay: Duration) -> Arc<FileSyncer> {
    Arc::new(FileSyncer::new(
        Arc::new(StaticStore { down, list_delay }),
        SyncPolicy {
            remote_root: "/PDF".into(),
            local_dest: dest.to_path_buf(),
            extension: "pdf".into(),
            max_attempts: 2,
            retry_delay: Duration::from_millis(10),
        },
    ))
}

#[tokio::test]
async fn sync_returns_report() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.pdf"), b"already here").unwrap();
    let app = common::build_test_app(
        Arc::new(MemoryJobQueue::new()),
        false,
        Some(syncer(dir.path(), false)),
    );

    let response = post_empty(app, "/sync").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["attempted"], 2);
    assert_eq!(json["data"]["succeeded"], 1);
    assert_eq!(json["data"]["skipped"], 1);
    assert_eq!(json["data"]["failed"], 0);
    assert_eq!(json["data"]["downloaded_files"][0]["name"], "b.pdf");
}

#[tokio::test]
async fn sync_without_credentials_is_not_configured() {
    let app = common::build_test_app(Arc::new(MemoryJobQueue::new()), false, None);
    let response = post_empty(app, "/sync").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "SYNC_NOT_CONFIGURED");
}

#[tokio::test]
async fn unreachable_remote_is_transient_infra_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(
        Arc::new(MemoryJobQueue::new()),
        false,
        Some(syncer(dir.path(), true)),
    );

    let response = post_empty(app, "/sync").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "TRANSIENT_INFRA_ERROR");
}

#[tokio::test]
async fn sync_is_not_bound_by_request_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        request_timeout_secs: 1,
        ..common::test_config()
    };
    let app = common::build_test_app_with(
        config,
        Arc::new(MemoryJobQueue::new()),
        false,
        Some(slow_syncer(dir.path(), false, Duration::from_millis(1500))),
    );

    let response = post_empty(app, "/sync").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["succeeded"], 2);
}

#[tokio::test]
async fn sync_has_its_own_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        sync_timeout: Duration::from_millis(100),
        ..common::test_config()
    };
    let app = common::build_test_app_with(
        config,
        Arc::new(MemoryJobQueue::new()),
        false,
        Some(slow_syncer(dir.path(), false, Duration::from_secs(2))),
    );

    let response = post_empty(app, "/sync").await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}
