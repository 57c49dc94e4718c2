use std::sync::Arc;

use docflow_sync::FileSyncer;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Job submission, polling and fleet status.
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<ServerConfig>,
    /// `None` when sync credentials are not configured.
    pub syncer: Option<Arc<FileSyncer>>,
}
