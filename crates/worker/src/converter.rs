//! The conversion collaborator seam.
//!
//! The worker never converts documents itself. A [`ModelLoader`] produces
//! a [`Converter`] once per process; every job reuses it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docflow_core::conversion::Metadata;

use crate::error::WorkerError;

/// Raw output of one conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Converted {
    pub text: String,
    /// Image name to raw image bytes.
    pub images: BTreeMap<String, Vec<u8>>,
    /// Metadata produced by the conversion itself.
    pub metadata: Metadata,
}

/// A conversion failure. `Failed` and `Timeout` are recorded on the
/// document's outcome; `Transport` means the converter itself is gone and
/// fails the job.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("{0}")]
    Failed(String),

    #[error("Conversion timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Converter unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert one document. `hint` is the externally supplied metadata for
    /// this file (possibly empty).
    async fn convert(
        &self,
        filename: &str,
        bytes: &[u8],
        hint: &Metadata,
    ) -> Result<Converted, ConvertError>;
}

/// Loads the heavyweight conversion resources. Called at most once per
/// successful initialization of the worker pool state.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Converter>, WorkerError>;
}
