use axum::extract::State;
use axum::Json;
use docflow_core::sync_report::SyncReport;
use docflow_sync::SyncError;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /sync
///
/// Run one sync with the configured remote store and return its report.
/// The run happens on its own task so slow transfers and retry delays do
/// not hold up request handling.
pub async fn run_sync(State(state): State<AppState>) -> AppResult<Json<DataResponse<SyncReport>>> {
    let syncer = state.syncer.clone().ok_or_else(|| {
        SyncError::Config("SYNC_HOST, SYNC_USERNAME and SYNC_PASSWORD must be set".into())
    })?;

    tracing::info!(root = %syncer.policy().remote_root, "Sync requested");
    let report = tokio::spawn(async move { syncer.run().await })
        .await
        .map_err(|e| AppError::InternalError(format!("Sync task panicked: {e}")))??;

    Ok(Json(DataResponse { data: report }))
}
