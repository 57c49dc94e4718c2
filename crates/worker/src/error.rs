use docflow_core::error::CoreError;
use docflow_core::queue::QueueError;

/// Infrastructure failures. Any of these aborts the job it occurs in and
/// leaves it in `failure` with no partial result.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Resource initialization failed: {0}")]
    Init(String),

    #[error("Converter unavailable: {0}")]
    ConverterUnavailable(String),

    #[error("Metadata table {path} is invalid: {reason}")]
    MetadataTable { path: String, reason: String },

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
