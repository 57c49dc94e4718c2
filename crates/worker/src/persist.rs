//! Writes converted documents under an output root.
//!
//! Layout per source document (see [`docflow_core::layout`]): a folder
//! named after the document stem holding `<stem>.md`, `<stem>_meta.json`
//! and every extracted image under its produced name.

use std::path::{Path, PathBuf};

use docflow_core::conversion::Metadata;
use docflow_core::layout::resolve_layout;

use crate::converter::Converted;
use crate::error::WorkerError;

pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist one document. `metadata` is the merged metadata.
    ///
    /// Returns the document's output folder.
    pub async fn write(
        &self,
        filename: &str,
        converted: &Converted,
        metadata: &Metadata,
    ) -> Result<PathBuf, WorkerError> {
        let layout = resolve_layout(&self.root, filename)?;
        // Validate every image name before touching the filesystem.
        let image_paths = converted
            .images
            .keys()
            .map(|name| layout.image_path(name))
            .collect::<Result<Vec<_>, _>>()?;

        tokio::fs::create_dir_all(&layout.dir).await?;
        tokio::fs::write(&layout.text, converted.text.as_bytes()).await?;

        let meta_json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| WorkerError::Io(std::io::Error::other(e)))?;
        tokio::fs::write(&layout.metadata, meta_json).await?;

        for (path, bytes) in image_paths.iter().zip(converted.images.values()) {
            tokio::fs::write(path, bytes).await?;
        }

        tracing::debug!(
            file = filename,
            dir = %layout.dir.display(),
            images = image_paths.len(),
            "Conversion output saved",
        );
        Ok(layout.dir)
    }
}
