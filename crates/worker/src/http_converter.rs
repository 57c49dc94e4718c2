//! [`Converter`] backed by an HTTP conversion sidecar.
//!
//! The sidecar keeps the models resident. `POST /convert` takes a
//! multipart body with a `file` part and a JSON `metadata` part and
//! answers `{text, images: {name: base64}, metadata}`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docflow_core::conversion::{decode_image, Metadata};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::converter::{ConvertError, Converted, Converter, ModelLoader};
use crate::error::WorkerError;

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    text: String,
    #[serde(default)]
    images: BTreeMap<String, String>,
    #[serde(default)]
    metadata: Metadata,
}

pub struct HttpConverter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConverter {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Ensure the response has a success status code, otherwise surface
    /// the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ConvertError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ConvertError::Failed(format!(
                "converter returned {}: {body}",
                status.as_u16()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Converter for HttpConverter {
    async fn convert(
        &self,
        filename: &str,
        bytes: &[u8],
        hint: &Metadata,
    ) -> Result<Converted, ConvertError> {
        let metadata = serde_json::to_string(hint)
            .map_err(|e| ConvertError::Failed(format!("unencodable metadata: {e}")))?;
        let form = Form::new()
            .part(
                "file",
                Part::bytes(bytes.to_vec())
                    .file_name(filename.to_string())
                    .mime_str("application/pdf")
                    .map_err(|e| ConvertError::Failed(e.to_string()))?,
            )
            .text("metadata", metadata);

        let response = self
            .client
            .post(format!("{}/convert", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConvertError::Failed(format!("converter request timed out: {e}"))
                } else {
                    ConvertError::Transport(e.to_string())
                }
            })?;

        let body: ConvertResponse = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ConvertError::Failed(format!("malformed converter response: {e}")))?;

        let mut images = BTreeMap::new();
        for (name, encoded) in body.images {
            let raw = decode_image(&encoded)
                .map_err(|e| ConvertError::Failed(format!("image {name} is not base64: {e}")))?;
            images.insert(name, raw);
        }

        Ok(Converted {
            text: body.text,
            images,
            metadata: body.metadata,
        })
    }
}

/// Checks that the sidecar is up, then hands out a shared client.
pub struct HttpModelLoader {
    base_url: String,
    timeout: Duration,
}

impl HttpModelLoader {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load(&self) -> Result<Arc<dyn Converter>, WorkerError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| WorkerError::Init(format!("HTTP client: {e}")))?;
        let converter = HttpConverter::new(client, self.base_url.clone());

        let health = converter
            .client
            .get(format!("{}/health", converter.base_url))
            .send()
            .await
            .map_err(|e| WorkerError::Init(format!("converter at {} unreachable: {e}", converter.base_url)))?;
        if !health.status().is_success() {
            return Err(WorkerError::Init(format!(
                "converter at {} is unhealthy ({})",
                converter.base_url,
                health.status().as_u16()
            )));
        }

        tracing::info!(converter_url = %converter.base_url, "Converter sidecar ready");
        Ok(Arc::new(converter))
    }
}
