/// A single remote operation failed. Eligible for retry.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Remote store error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed listing: {0}")]
    Listing(String),

    #[error("Local I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The sync run as a whole could not proceed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Sync is not configured: {0}")]
    Config(String),

    #[error("Failed to prepare local destination {path}: {source}")]
    Setup {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list remote folder {root}: {source}")]
    Listing {
        root: String,
        #[source]
        source: RemoteError,
    },
}
