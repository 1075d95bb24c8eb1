//! Google Drive v3 resumable uploads.

use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use super::config::UploaderConfig;
use super::error::UploaderError;
use super::traits::StorageService;
use super::types::{ChunkStatus, Credential, RemoteArtifact, UploadMetadata, UploadSession};

/// Fields requested for the created file.
const RESPONSE_FIELDS: &str = "id,webViewLink";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// Storage service for Google Drive.
pub struct DriveStorage {
    client: Client,
    upload_base: String,
    chunk_size: usize,
}

impl DriveStorage {
    pub fn new(
        upload_base: impl Into<String>,
        chunk_size: usize,
        timeout: Duration,
    ) -> Result<Self, UploaderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            upload_base: upload_base.into(),
            chunk_size: chunk_size.max(1),
        })
    }

    pub fn from_config(config: &UploaderConfig) -> Result<Self, UploaderError> {
        Self::new(
            config.upload_base.clone(),
            config.chunk_size_bytes,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn base_url(&self) -> &str {
        self.upload_base.trim_end_matches('/')
    }

    /// Reads up to one chunk starting at `offset`.
    async fn read_chunk(&self, path: &Path, offset: u64) -> Result<Vec<u8>, UploaderError> {
        let mut file = tokio::fs::File::open(path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut chunk = Vec::with_capacity(self.chunk_size);
        file.take(self.chunk_size as u64)
            .read_to_end(&mut chunk)
            .await?;
        Ok(chunk)
    }

    async fn error_from(response: reqwest::Response) -> UploaderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = body.chars().take(300).collect::<String>();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            UploaderError::Unauthorized(message)
        } else {
            UploaderError::api(status.as_u16(), message)
        }
    }
}

/// Parses a `Range: bytes=0-N` header into the number of persisted bytes.
fn persisted_bytes(range: Option<&str>) -> Option<u64> {
    let range = range?;
    let end = range.trim().strip_prefix("bytes=")?.split('-').nth(1)?;
    end.trim().parse::<u64>().ok().map(|end| end + 1)
}

#[async_trait]
impl StorageService for DriveStorage {
    fn name(&self) -> &str {
        "google-drive"
    }

    async fn create_upload_session(
        &self,
        credential: &Credential,
        metadata: &UploadMetadata,
        file: &Path,
    ) -> Result<UploadSession, UploaderError> {
        let bytes_total = tokio::fs::metadata(file).await?.len();
        let url = format!("{}/files", self.base_url());

        let mut body = json!({
            "name": metadata.name,
            "mimeType": metadata.mime_type,
        });
        if let Some(folder) = &metadata.parent_folder_id {
            body["parents"] = json!([folder]);
        }

        let response = self
            .client
            .post(&url)
            .query(&[
                ("uploadType", "resumable"),
                ("supportsAllDrives", "true"),
                ("fields", RESPONSE_FIELDS),
            ])
            .bearer_auth(&credential.access_token)
            .header("X-Upload-Content-Type", &metadata.mime_type)
            .header("X-Upload-Content-Length", bytes_total)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| UploaderError::invalid_response("missing Location header"))?;

        debug!(name = %metadata.name, bytes_total, "Opened resumable upload session");

        Ok(UploadSession {
            session_uri,
            file_path: file.to_path_buf(),
            bytes_total,
            bytes_done: 0,
            credential: credential.clone(),
        })
    }

    async fn next_chunk(&self, session: &mut UploadSession) -> Result<ChunkStatus, UploaderError> {
        let start = session.bytes_done;
        let chunk = if session.bytes_total == 0 {
            Vec::new()
        } else {
            self.read_chunk(&session.file_path, start).await?
        };

        let content_range = if chunk.is_empty() {
            format!("bytes */{}", session.bytes_total)
        } else {
            format!(
                "bytes {}-{}/{}",
                start,
                start + chunk.len() as u64 - 1,
                session.bytes_total
            )
        };
        let sent = chunk.len() as u64;

        let response = self
            .client
            .put(&session.session_uri)
            .bearer_auth(&session.credential.access_token)
            .header(CONTENT_RANGE, content_range)
            .body(chunk)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let file: DriveFile = response.json().await?;
                session.bytes_done = session.bytes_total;
                Ok(ChunkStatus::Complete(RemoteArtifact {
                    remote_id: file.id,
                    view_link: file.web_view_link,
                }))
            }
            StatusCode::PERMANENT_REDIRECT => {
                let range = response
                    .headers()
                    .get(RANGE)
                    .and_then(|v| v.to_str().ok());
                let done = persisted_bytes(range).unwrap_or(0);
                if done <= start && sent > 0 {
                    return Err(UploaderError::invalid_response(format!(
                        "no progress after sending {sent} bytes at offset {start}"
                    )));
                }
                session.bytes_done = done.min(session.bytes_total);
                Ok(ChunkStatus::Progress {
                    bytes_done: session.bytes_done,
                })
            }
            _ => Err(Self::error_from(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_bytes() {
        assert_eq!(persisted_bytes(Some("bytes=0-262143")), Some(262144));
        assert_eq!(persisted_bytes(Some("bytes=0-0")), Some(1));
        assert_eq!(persisted_bytes(Some("garbage")), None);
        assert_eq!(persisted_bytes(None), None);
    }
}
