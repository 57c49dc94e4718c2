//! Summary of one sync run.
//!
//! Built incrementally while files move through their per-file state
//! machine, then finalized and logged once. Never persisted.

use serde::{Deserialize, Serialize};

/// A file and its size on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size_bytes: u64,
}

/// A file that exhausted its attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub name: String,
    pub last_error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub downloaded_files: Vec<FileEntry>,
    pub failures: Vec<FailedFile>,
    /// Every matching file in the destination after the run.
    pub local_files: Vec<FileEntry>,
}

impl SyncReport {
    pub fn record_skipped(&mut self) {
        self.attempted += 1;
        self.skipped += 1;
    }

    pub fn record_downloaded(&mut self, name: impl Into<String>, size_bytes: u64) {
        self.attempted += 1;
        self.succeeded += 1;
        self.downloaded_files.push(FileEntry {
            name: name.into(),
            size_bytes,
        });
    }

    pub fn record_failed(&mut self, name: impl Into<String>, last_error: impl Into<String>) {
        self.attempted += 1;
        self.failed += 1;
        self.failures.push(FailedFile {
            name: name.into(),
            last_error: last_error.into(),
        });
    }

    /// `succeeded + failed + skipped == attempted`.
    pub fn is_balanced(&self) -> bool {
        self.succeeded + self.failed + self.skipped == self.attempted
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_files.iter().map(|f| f.size_bytes).sum()
    }

    pub fn local_bytes(&self) -> u64 {
        self.local_files.iter().map(|f| f.size_bytes).sum()
    }

    /// Log the run summary followed by the local file inventory.
    pub fn log_summary(&self) {
        tracing::info!(
            attempted = self.attempted,
            succeeded = self.succeeded,
            failed = self.failed,
            skipped = self.skipped,
            downloaded_mb = format_args!("{:.2}", to_mb(self.downloaded_bytes())),
            "Sync run finished",
        );
        for failure in &self.failures {
            tracing::warn!(file = %failure.name, error = %failure.last_error, "File failed to sync");
        }
        for file in &self.local_files {
            tracing::info!(file = %file.name, size_mb = format_args!("{:.2}", to_mb(file.size_bytes)), "Local file");
        }
        tracing::info!(
            files = self.local_files.len(),
            total_mb = format_args!("{:.2}", to_mb(self.local_bytes())),
            "Local inventory",
        );
    }
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
