//! Operator-facing status texts.

use crate::task::TaskFailure;

pub fn download_starting(title: &str) -> String {
    format!("⏳ Starting download: {title}")
}

pub fn download_complete(title: &str) -> String {
    format!("✅ Download complete: {title}\n\n📤 Preparing upload...")
}

pub fn completed(title: &str) -> String {
    format!("✅ Completed!\n\n🎬 Title: {title}")
}

pub fn cancelled(title: &str) -> String {
    format!("❌ Download cancelled: {title}")
}

/// Failure message with the reason cut to `max_chars`.
pub fn failed(title: &str, failure: &TaskFailure, max_chars: usize) -> String {
    match failure {
        TaskFailure::Auth(reason) => format!(
            "❌ Could not authenticate with the storage service.\n\n{}",
            truncate(reason, max_chars)
        ),
        TaskFailure::Retrieval(stderr) => format!(
            "❌ Download failed: {title}\n\n{}",
            truncate(stderr, max_chars)
        ),
        TaskFailure::Transfer(reason) => format!(
            "❌ Upload failed: {title}\n\n{}",
            truncate(reason, max_chars)
        ),
        TaskFailure::Internal(reason) => format!(
            "❌ Unexpected error for {title}\n\n{}",
            truncate(reason, max_chars)
        ),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
