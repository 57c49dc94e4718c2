//! On-disk layout for persisted conversion output.
//!
//! For a source document `report.pdf` under output root `out/`:
//!
//! ```text
//! out/report/report.md
//! out/report/report_meta.json
//! out/report/<image name>   (one file per extracted image)
//! ```

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Paths for one document's persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub dir: PathBuf,
    pub text: PathBuf,
    pub metadata: PathBuf,
}

impl OutputLayout {
    /// Path for an extracted image. Rejects names that could escape `dir`.
    pub fn image_path(&self, name: &str) -> Result<PathBuf, CoreError> {
        validate_artifact_name(name)?;
        Ok(self.dir.join(name))
    }
}

/// Strip the directory part and the last extension from a filename.
///
/// `"scans/report.v2.pdf"` becomes `"report.v2"`. A name with no usable
/// stem (e.g. `".pdf"`) falls back to the whole file name.
pub fn document_stem(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(0) | None => base.to_string(),
        Some(idx) => base[..idx].to_string(),
    }
}

/// Resolve the artifact paths for `filename` under `root`.
pub fn resolve_layout(root: &Path, filename: &str) -> Result<OutputLayout, CoreError> {
    let stem = document_stem(filename);
    validate_artifact_name(&stem)?;

    let dir = root.join(&stem);
    Ok(OutputLayout {
        text: dir.join(format!("{stem}.md")),
        metadata: dir.join(format!("{stem}_meta.json")),
        dir,
    })
}

/// Reject empty names, path separators and the `.`/`..` directory names.
///
/// Dots elsewhere in a name are fine: `Q1..Q2 report` is a plain file name.
pub fn validate_artifact_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Artifact name is empty".into()));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(CoreError::Validation(format!(
            "Artifact name '{name}' must not contain path components"
        )));
    }
    Ok(())
}
