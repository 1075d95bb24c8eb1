//! Core of the media relay: retrieval with yt-dlp, resumable upload to
//! Google Drive, and throttled progress messages in a chat.

pub mod config;
pub mod downloader;
pub mod metrics;
pub mod notifier;
pub mod orchestrator;
pub mod progress;
pub mod task;
pub mod testing;
pub mod uploader;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig, TelegramConfig,
};
pub use orchestrator::{
    StartTaskRequest, TaskHandle, TaskOrchestrator, TaskOutcome, CANCEL_TOKEN_PREFIX,
};
pub use task::{Task, TaskId, TaskState};
