//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the pipeline (retrieval process,
//! storage service, credentials, chat front-end), so the orchestrator can be
//! exercised end to end without yt-dlp, Google Drive or Telegram.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediarelay_core::testing::{MockDownloader, MockStorageService, MockNotificationSink};
//!
//! let downloader = MockDownloader::new();
//! downloader.set_steps(vec![25, 50, 100]).await;
//!
//! let storage = MockStorageService::new(1024, 256);
//! let sink = MockNotificationSink::new();
//! ```

mod mock_downloader;
mod mock_notifier;
mod mock_storage;

pub use mock_downloader::{MockDownloadBehavior, MockDownloader};
pub use mock_notifier::{MockNotificationSink, RecordedRender};
pub use mock_storage::{MockCredentialProvider, MockStorageService};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::notifier::{Action, MessageRef, NotificationTarget};

    /// A notification target with a single cancel action.
    pub fn target(chat_id: i64, message_id: i64, title: &str) -> NotificationTarget {
        NotificationTarget {
            message: MessageRef::new(chat_id, message_id),
            title: title.to_string(),
            actions: vec![Action::callback("❌ Cancel", "cancel_fixture")],
        }
    }
}
