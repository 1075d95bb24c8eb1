//! Error types for the downloader module.

use thiserror::Error;

/// Errors that can occur while driving the retrieval process.
#[derive(Debug, Error)]
pub enum DownloaderError {
    /// The retrieval binary could not be found or started.
    #[error("Downloader binary not found: {0}")]
    BinaryNotFound(String),

    /// Spawning or talking to the process failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The title lookup exited non-zero.
    #[error("Title lookup failed: {0}")]
    TitleLookupFailed(String),

    #[error("Invalid quality: {0}")]
    InvalidQuality(String),

    #[error("Invalid URL rewrite rule '{name}': {reason}")]
    InvalidRewriteRule { name: String, reason: String },
}

impl DownloaderError {
    pub fn title_lookup_failed(reason: impl Into<String>) -> Self {
        Self::TitleLookupFailed(reason.into())
    }
}
