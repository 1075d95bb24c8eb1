//! Error types for the notifier module.

use thiserror::Error;

/// Errors a notification sink can report.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// The message no longer exists (deleted by the operator).
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The new content is identical to the current one.
    #[error("Message not modified")]
    NotModified,

    /// The sink asked us to slow down.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Any other delivery problem.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

impl NotifyError {
    pub fn delivery_failed(reason: impl Into<String>) -> Self {
        Self::DeliveryFailed(reason.into())
    }

    /// Whether the failure means the content is already what we wanted.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NotModified)
    }
}
