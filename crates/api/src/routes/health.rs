use axum::extract::State;
use axum::{routing::get, Json, Router};
use docflow_core::fleet::ServerType;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// `distributed` when workers answered the probe, else `simple`.
    pub server_type: ServerType,
    pub live: bool,
    pub worker_count: u32,
}

/// GET /health -- probes the worker fleet.
async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let fleet = state.dispatcher.fleet_status().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        server_type: fleet.server_type(),
        live: fleet.live,
        worker_count: fleet.worker_count,
    }))
}

/// Mount health check routes at the root.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
