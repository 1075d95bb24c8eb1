//! Error types for the uploader module.

use thiserror::Error;

/// Errors that can occur while talking to the credential store or the
/// storage service.
#[derive(Debug, Error)]
pub enum UploaderError {
    /// The storage service rejected the credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The credential could not be loaded or refreshed.
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    /// Non-success status from the storage service.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered with something we cannot interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploaderError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse(reason.into())
    }

    /// Whether the failure is about the credential rather than the transfer.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Credential(_))
    }
}

impl From<reqwest::Error> for UploaderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else {
            Self::InvalidResponse(e.to_string())
        }
    }
}
