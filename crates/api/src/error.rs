use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docflow_core::error::CoreError;
use docflow_core::queue::QueueError;
use docflow_sync::SyncError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` JSON bodies.
/// Every 5xx is logged at error level.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job was accepted but did not finish in time.
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Queue(queue) => classify_queue_error(queue),
            AppError::Sync(sync) => classify_sync_error(sync),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Unreachable backends are 503 so clients know to retry; an unknown job
/// is 404, distinct from a job that failed.
fn classify_queue_error(err: &QueueError) -> (StatusCode, &'static str, String) {
    match err {
        QueueError::Unavailable(msg) => {
            tracing::error!(error = %msg, "Queue backend unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "TRANSIENT_INFRA_ERROR",
                "Job queue is unavailable, retry later".to_string(),
            )
        }
        QueueError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Job with id {id} not found"),
        ),
        QueueError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "CONFLICT", err.to_string())
        }
        QueueError::Corrupt(msg) => {
            tracing::error!(error = %msg, "Corrupt job record");
            internal()
        }
        QueueError::Rejected(core) => classify_core_error(core),
    }
}

fn classify_sync_error(err: &SyncError) -> (StatusCode, &'static str, String) {
    match err {
        SyncError::Config(msg) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SYNC_NOT_CONFIGURED",
            msg.clone(),
        ),
        SyncError::Listing { .. } => {
            tracing::error!(error = %err, "Sync listing failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "TRANSIENT_INFRA_ERROR",
                err.to_string(),
            )
        }
        SyncError::Setup { .. } => {
            tracing::error!(error = %err, "Sync setup failed");
            internal()
        }
    }
}
