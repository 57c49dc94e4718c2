//! [`RemoteStore`] over WebDAV with HTTP basic auth.
//!
//! Listing issues `PROPFIND` with `Depth: 1` and reads the multistatus
//! response; downloads are plain `GET`s streamed to disk.

use std::path::Path;

use async_trait::async_trait;
use quick_xml::events::Event;
use tokio::io::AsyncWriteExt;

use crate::config::SyncCredentials;
use crate::error::RemoteError;
use crate::remote::{RemoteEntry, RemoteStore};

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
  </d:prop>
</d:propfind>"#;

pub struct WebDavStore {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl WebDavStore {
    pub fn new(credentials: &SyncCredentials) -> Self {
        Self::with_client(reqwest::Client::new(), credentials)
    }

    pub fn with_client(client: reqwest::Client, credentials: &SyncCredentials) -> Self {
        Self {
            client,
            base_url: credentials.host.trim_end_matches('/').to_string(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        }
    }

    /// Join an unencoded remote path onto the host, percent-encoding each
    /// segment.
    fn url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base_url, encoded.join("/"))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteStore for WebDavStore {
    async fn list(&self, root: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let method = reqwest::Method::from_bytes(b"PROPFIND")
            .map_err(|e| RemoteError::Listing(e.to_string()))?;
        let folder = format!("{}/", root.trim_end_matches('/'));

        let response = self
            .client
            .request(method, self.url(&folder))
            .basic_auth(&self.username, Some(&self.password))
            .header("Depth", "1")
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await?;
        let body = Self::ensure_success(response).await?.text().await?;

        parse_multistatus(&body)
    }

    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<u64, RemoteError> {
        let mut response = Self::ensure_success(
            self.client
                .get(self.url(remote_path))
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await?,
        )
        .await?;

        let mut file = tokio::fs::File::create(local_path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Multistatus parsing
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PendingResponse {
    href: String,
    is_collection: bool,
    size: Option<u64>,
}

#[derive(Clone, Copy, PartialEq)]
enum TextTarget {
    None,
    Href,
    Length,
}

/// Extract the files from a `207 Multi-Status` body. Collections,
/// including the listed folder itself, are dropped.
pub fn parse_multistatus(xml: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<PendingResponse> = None;
    let mut target = TextTarget::None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => current = Some(PendingResponse::default()),
                b"href" => target = TextTarget::Href,
                b"getcontentlength" => target = TextTarget::Length,
                b"collection" => {
                    if let Some(resp) = current.as_mut() {
                        resp.is_collection = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" {
                    if let Some(resp) = current.as_mut() {
                        resp.is_collection = true;
                    }
                }
            }
            Ok(Event::Text(te)) => {
                let text = te
                    .unescape()
                    .map_err(|e| RemoteError::Listing(e.to_string()))?;
                if let Some(resp) = current.as_mut() {
                    match target {
                        TextTarget::Href => resp.href.push_str(&text),
                        TextTarget::Length => resp.size = text.trim().parse().ok(),
                        TextTarget::None => {}
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"href" | b"getcontentlength" => target = TextTarget::None,
                b"response" => {
                    if let Some(resp) = current.take() {
                        if !resp.is_collection && !resp.href.ends_with('/') {
                            if let Some(name) = file_name_from_href(&resp.href) {
                                entries.push(RemoteEntry {
                                    name,
                                    size_bytes: resp.size,
                                });
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(RemoteError::Listing(e.to_string())),
            _ => {}
        }
    }

    Ok(entries)
}

/// Last path segment of an href, percent-decoded.
fn file_name_from_href(href: &str) -> Option<String> {
    let segment = href.trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    let name = urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(name)
}
