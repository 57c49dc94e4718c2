//! The remote file store seam.

use std::path::Path;

use async_trait::async_trait;

use crate::error::RemoteError;

/// A file directly under the listed folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub size_bytes: Option<u64>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Files (not folders) directly under `root`.
    async fn list(&self, root: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Copy `remote_path` to `local_path`, replacing it. Returns bytes written.
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError>;
}

/// Join a remote folder and a file name with exactly one `/`.
pub fn remote_path(root: &str, name: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), name.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_single_slash() {
        assert_eq!(remote_path("/PDF", "a.pdf"), "/PDF/a.pdf");
        assert_eq!(remote_path("/PDF/", "a.pdf"), "/PDF/a.pdf");
        assert_eq!(remote_path("/PDF", "/a.pdf"), "/PDF/a.pdf");
    }
}
