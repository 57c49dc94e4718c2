pub mod health;
pub mod jobs;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Routes that are always mounted.
///
/// ```text
/// GET  /health            fleet status and server type
/// ```
pub fn base_routes() -> Router<AppState> {
    Router::new().merge(health::router())
}

/// Always mounted, under its own timeout.
///
/// ```text
/// POST /sync              run one file sync
/// ```
pub fn sync_routes() -> Router<AppState> {
    Router::new().route("/sync", post(handlers::sync::run_sync))
}

/// Routes that need a live worker fleet.
///
/// ```text
/// POST /convert           submit one document and wait
/// POST /jobs/convert      submit one document
/// POST /jobs/batch        submit several documents
/// GET  /jobs/{id}         poll
/// ```
pub fn conversion_routes() -> Router<AppState> {
    Router::new()
        .route("/convert", post(handlers::jobs::convert_and_wait))
        .nest("/jobs", jobs::router())
}
