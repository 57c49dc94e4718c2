//! The sync run.
//!
//! Every matching remote file moves through
//! `pre-check -> transfer -> verify`, retried up to `max_attempts`, and
//! ends in exactly one of [`FileState`]. Per-file failures are reported,
//! never raised; only listing or destination setup failures abort the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use docflow_core::hashing::sha256_file;
use docflow_core::layout::validate_artifact_name;
use docflow_core::sync_report::{FileEntry, SyncReport};

use crate::error::{RemoteError, SyncError};
use crate::remote::{remote_path, RemoteStore};

/// Where to sync from and to, and how hard to try.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    pub remote_root: String,
    pub local_dest: PathBuf,
    /// Extension to keep, without the dot. Matched case-insensitively.
    pub extension: String,
    /// Total attempts per file, including the first.
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    /// A same-named local file already existed.
    Skipped,
    Downloaded { size_bytes: u64 },
    Failed { last_error: String },
}

/// Why one attempt did not produce a verified file.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error("transfer failed: {0}")]
    Transfer(RemoteError),

    #[error("verification download failed: {0}")]
    Verify(RemoteError),

    #[error("checksum mismatch between download and verification copy")]
    Mismatch,

    #[error("failed to hash local file: {0}")]
    Hash(std::io::Error),
}

pub struct FileSyncer {
    store: Arc<dyn RemoteStore>,
    policy: SyncPolicy,
}

impl FileSyncer {
    pub fn new(store: Arc<dyn RemoteStore>, policy: SyncPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Run one sync. Always returns a report unless listing or setup fails.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let dest = &self.policy.local_dest;
        if !tokio::fs::try_exists(dest).await.unwrap_or(false) {
            tokio::fs::create_dir_all(dest)
                .await
                .map_err(|source| SyncError::Setup {
                    path: dest.display().to_string(),
                    source,
                })?;
            tracing::info!(dest = %dest.display(), "Created local destination");
        }

        tracing::info!(root = %self.policy.remote_root, "Listing remote files");
        let entries = self
            .store
            .list(&self.policy.remote_root)
            .await
            .map_err(|source| SyncError::Listing {
                root: self.policy.remote_root.clone(),
                source,
            })?;

        let matching: Vec<String> = entries
            .into_iter()
            .map(|e| e.name)
            .filter(|name| has_extension(name, &self.policy.extension))
            .collect();

        let mut report = SyncReport::default();
        if matching.is_empty() {
            tracing::warn!(
                root = %self.policy.remote_root,
                extension = %self.policy.extension,
                "No matching remote files found",
            );
            return Ok(report);
        }
        tracing::info!(count = matching.len(), "Found remote files");

        for name in &matching {
            match self.sync_file(name).await {
                FileState::Skipped => report.record_skipped(),
                FileState::Downloaded { size_bytes } => report.record_downloaded(name, size_bytes),
                FileState::Failed { last_error } => report.record_failed(name, last_error),
            }
        }

        report.local_files = local_inventory(dest, &self.policy.extension).await;
        report.log_summary();
        Ok(report)
    }

    /// Drive one file to its terminal state.
    pub async fn sync_file(&self, name: &str) -> FileState {
        if let Err(e) = validate_artifact_name(name) {
            tracing::error!(file = name, error = %e, "Refusing unsafe remote file name");
            return FileState::Failed {
                last_error: e.to_string(),
            };
        }

        let local = self.policy.local_dest.join(name);
        if tokio::fs::try_exists(&local).await.unwrap_or(false) {
            tracing::info!(file = name, "File already exists, skipping");
            return FileState::Skipped;
        }

        let remote = remote_path(&self.policy.remote_root, name);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&remote, &local).await {
                Ok(size_bytes) => {
                    tracing::info!(file = name, attempt, size_bytes, "File downloaded and verified");
                    return FileState::Downloaded { size_bytes };
                }
                Err(e) => {
                    last_error = e.to_string();
                    remove_if_present(&local).await;
                    tracing::warn!(file = name, attempt, max_attempts, error = %e, "Download attempt failed");
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
        }

        tracing::error!(file = name, attempts = max_attempts, error = %last_error, "File failed");
        FileState::Failed { last_error }
    }

    /// Transfer, then verify against a second copy at `<local>.temp`.
    async fn attempt(&self, remote: &str, local: &Path) -> Result<u64, AttemptError> {
        let size = self
            .store
            .download(remote, local)
            .await
            .map_err(AttemptError::Transfer)?;

        let temp = temp_path(local);
        let verified = self.verify(remote, local, &temp).await;
        remove_if_present(&temp).await;
        verified.map(|()| size)
    }

    async fn verify(&self, remote: &str, local: &Path, temp: &Path) -> Result<(), AttemptError> {
        self.store
            .download(remote, temp)
            .await
            .map_err(AttemptError::Verify)?;

        let downloaded = sha256_file(local).await.map_err(AttemptError::Hash)?;
        let copy = sha256_file(temp).await.map_err(AttemptError::Hash)?;
        if downloaded == copy {
            Ok(())
        } else {
            Err(AttemptError::Mismatch)
        }
    }
}

/// `report.pdf` -> `report.pdf.temp`.
pub fn temp_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_owned();
    name.push(".temp");
    PathBuf::from(name)
}

fn has_extension(name: &str, extension: &str) -> bool {
    let extension = extension.trim_start_matches('.');
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

/// Matching files in `dest`, sorted by name.
async fn local_inventory(dest: &Path, extension: &str) -> Vec<FileEntry> {
    let mut files = Vec::new();
    let mut dir = match tokio::fs::read_dir(dest).await {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(dest = %dest.display(), error = %e, "Failed to read local destination");
            return files;
        }
    };

    while let Ok(Some(entry)) = dir.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !has_extension(&name, extension) {
            continue;
        }
        if let Ok(meta) = entry.metadata().await {
            if meta.is_file() {
                files.push(FileEntry {
                    name,
                    size_bytes: meta.len(),
                });
            }
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    files
}
