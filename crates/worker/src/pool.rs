//! Process-wide worker state, initialized once.
//!
//! Holds the loaded converter and the per-file metadata table. The first
//! job that needs them triggers [`WorkerPool::ensure_initialized`];
//! concurrent or repeated calls wait for and reuse the same state. A
//! failed initialization leaves the cell empty so the next job retries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docflow_core::conversion::Metadata;
use tokio::sync::OnceCell;

use crate::converter::{Converter, ModelLoader};
use crate::error::WorkerError;

/// Loaded resources shared by every job in this process.
pub struct WorkerPoolState {
    pub converter: Arc<dyn Converter>,
    metadata_table: HashMap<String, Metadata>,
}

impl WorkerPoolState {
    /// External metadata for `filename`, empty when the table has no entry.
    pub fn metadata_for(&self, filename: &str) -> Metadata {
        self.metadata_table.get(filename).cloned().unwrap_or_default()
    }

    pub fn metadata_entries(&self) -> usize {
        self.metadata_table.len()
    }
}

impl std::fmt::Debug for WorkerPoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPoolState")
            .field("metadata_entries", &self.metadata_table.len())
            .finish_non_exhaustive()
    }
}

pub struct WorkerPool {
    loader: Arc<dyn ModelLoader>,
    metadata_path: PathBuf,
    state: OnceCell<Arc<WorkerPoolState>>,
}

impl WorkerPool {
    pub fn new(loader: Arc<dyn ModelLoader>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            metadata_path: metadata_path.into(),
            state: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized()
    }

    /// Load models and the metadata table on first call; return the shared
    /// state on every call.
    pub async fn ensure_initialized(&self) -> Result<Arc<WorkerPoolState>, WorkerError> {
        let state = self
            .state
            .get_or_try_init(|| async {
                tracing::info!("Loading conversion models");
                let converter = self.loader.load().await?;
                let metadata_table = load_metadata_table(&self.metadata_path).await?;
                tracing::info!(
                    metadata_entries = metadata_table.len(),
                    "Worker resources initialized",
                );
                Ok::<_, WorkerError>(Arc::new(WorkerPoolState {
                    converter,
                    metadata_table,
                }))
            })
            .await?;
        Ok(Arc::clone(state))
    }
}

/// Read the filename -> metadata table. A missing file is an empty table.
pub async fn load_metadata_table(path: &Path) -> Result<HashMap<String, Metadata>, WorkerError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Metadata table not found, using empty table");
            return Ok(HashMap::new());
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice::<HashMap<String, Metadata>>(&raw).map_err(|e| {
        WorkerError::MetadataTable {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })
}
