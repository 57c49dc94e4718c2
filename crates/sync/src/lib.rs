//! Resilient bulk download of remote documents into a local staging
//! directory, with checksum verification and bounded retries.

pub mod config;
pub mod error;
pub mod remote;
pub mod syncer;
pub mod webdav;

pub use config::{SyncConfig, SyncCredentials};
pub use error::{RemoteError, SyncError};
pub use remote::{RemoteEntry, RemoteStore};
pub use syncer::{FileState, FileSyncer, SyncPolicy};
pub use webdav::WebDavStore;
