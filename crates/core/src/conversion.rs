//! Per-document conversion outcomes and aggregated job results.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Free-form key/value metadata attached to a document.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Whether a single document converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    Error,
}

/// Result of converting one document.
///
/// Build with [`ConversionOutcome::ok`] or [`ConversionOutcome::error`];
/// an `ok` outcome carries text and images, an `error` outcome carries
/// only the failure message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub filename: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image name to base64-encoded image bytes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionOutcome {
    /// A successful conversion. Images are encoded for transport here.
    pub fn ok(
        filename: impl Into<String>,
        text: String,
        images: &BTreeMap<String, Vec<u8>>,
        metadata: Metadata,
    ) -> Self {
        Self {
            filename: filename.into(),
            status: OutcomeStatus::Ok,
            text: Some(text),
            images: images
                .iter()
                .map(|(name, bytes)| (name.clone(), encode_image(bytes)))
                .collect(),
            metadata,
            error: None,
        }
    }

    /// A failed conversion carrying the collaborator's message.
    pub fn error(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: OutcomeStatus::Error,
            text: None,
            images: BTreeMap::new(),
            metadata: Metadata::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }
}

/// The stored result of a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobResult {
    Single { outcome: ConversionOutcome },
    /// One outcome per submitted document, in submission order.
    Batch { outcomes: Vec<ConversionOutcome> },
    Probe { worker: String },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Merge externally supplied metadata over metadata produced by conversion.
///
/// On overlapping keys the external value wins.
pub fn merge_metadata(computed: Metadata, external: &Metadata) -> Metadata {
    let mut merged = computed;
    for (key, value) in external {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Encode raw image bytes as standard base64.
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 image produced by [`encode_image`].
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: serde_json::Value) -> Metadata {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn external_metadata_wins_on_overlap() {
        let computed = meta(json!({"title": "From model", "pages": 3}));
        let external = meta(json!({"title": "Certificate", "owner": "ops"}));

        let merged = merge_metadata(computed, &external);

        assert_eq!(merged["title"], "Certificate");
        assert_eq!(merged["pages"], 3);
        assert_eq!(merged["owner"], "ops");
    }

    #[test]
    fn empty_external_keeps_computed() {
        let computed = meta(json!({"pages": 1}));
        let merged = merge_metadata(computed.clone(), &Metadata::new());
        assert_eq!(merged, computed);
    }

    #[test]
    fn ok_outcome_encodes_images() {
        let mut images = BTreeMap::new();
        images.insert("fig_1.png".to_string(), vec![0x89, 0x50, 0x4e, 0x47]);

        let outcome = ConversionOutcome::ok("a.pdf", "# A".into(), &images, Metadata::new());

        assert!(outcome.is_ok());
        assert!(outcome.error.is_none());
        assert_eq!(outcome.images["fig_1.png"], "iVBORw==");
        assert_eq!(decode_image(&outcome.images["fig_1.png"]).unwrap(), images["fig_1.png"]);
    }

    #[test]
    fn error_outcome_has_no_text_or_images() {
        let outcome = ConversionOutcome::error("bad.pdf", "corrupt xref table");
        assert!(!outcome.is_ok());
        assert!(outcome.text.is_none());
        assert!(outcome.images.is_empty());
        assert_eq!(outcome.error.as_deref(), Some("corrupt xref table"));
    }

    #[test]
    fn error_outcome_serializes_without_success_fields() {
        let value = serde_json::to_value(ConversionOutcome::error("bad.pdf", "boom")).unwrap();
        assert_eq!(
            value,
            json!({"filename": "bad.pdf", "status": "error", "error": "boom"})
        );
    }

    #[test]
    fn job_result_is_tagged_by_kind() {
        let value = serde_json::to_value(JobResult::Probe {
            worker: "w-1".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"kind": "probe", "worker": "w-1"}));

        let back: JobResult = serde_json::from_value(value).unwrap();
        assert_eq!(
            back,
            JobResult::Probe {
                worker: "w-1".into()
            }
        );
    }
}
