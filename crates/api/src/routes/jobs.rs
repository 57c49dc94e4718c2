use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /convert         -> submit_single
/// POST   /batch           -> submit_batch
/// GET    /{id}            -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/convert", post(jobs::submit_single))
        .route("/batch", post(jobs::submit_batch))
        .route("/{id}", get(jobs::get_job))
}
