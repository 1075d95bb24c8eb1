//! Uploader configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Resumable uploads require chunk sizes to be a multiple of this.
pub const CHUNK_ALIGNMENT: usize = 256 * 1024;

/// Configuration for the Google Drive uploader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Path to the OAuth token file (Google `token.json` format).
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    /// Token endpoint used when the token file does not name one.
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,

    /// Base URL of the Drive upload API.
    #[serde(default = "default_upload_base")]
    pub upload_base: String,

    /// Destination folder id.
    #[serde(default)]
    pub folder_id: String,

    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    /// Bytes per chunk. Must be a multiple of 256 KiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_token_endpoint() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_mime_type() -> String {
    "video/mp4".to_string()
}

fn default_chunk_size() -> usize {
    32 * CHUNK_ALIGNMENT
}

fn default_timeout() -> u64 {
    300
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            token_endpoint: default_token_endpoint(),
            upload_base: default_upload_base(),
            folder_id: String::new(),
            mime_type: default_mime_type(),
            chunk_size_bytes: default_chunk_size(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_size_is_aligned() {
        let config = UploaderConfig::default();
        assert_eq!(config.chunk_size_bytes, 8 * 1024 * 1024);
        assert_eq!(config.chunk_size_bytes % CHUNK_ALIGNMENT, 0);
    }
}
