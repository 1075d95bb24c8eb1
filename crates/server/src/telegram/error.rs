//! Error types for the Telegram adapter.

use thiserror::Error;

use mediarelay_core::notifier::NotifyError;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    /// The Bot API answered `ok: false`.
    #[error("Telegram API error ({code}): {description}")]
    Api { code: u16, description: String },

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL embeds the bot token
        let e = e.without_url();
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else {
            Self::InvalidResponse(e.to_string())
        }
    }
}

impl From<TelegramError> for NotifyError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::Api { description, .. } => {
                let lower = description.to_lowercase();
                if lower.contains("message is not modified") {
                    NotifyError::NotModified
                } else if lower.contains("message to edit not found")
                    || lower.contains("message can't be edited")
                {
                    NotifyError::MessageNotFound(description)
                } else {
                    NotifyError::DeliveryFailed(description)
                }
            }
            TelegramError::RateLimited { retry_after_secs } => {
                NotifyError::RateLimited { retry_after_secs }
            }
            other => NotifyError::DeliveryFailed(other.to_string()),
        }
    }
}
