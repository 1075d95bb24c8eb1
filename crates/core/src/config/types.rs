use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::downloader::DownloaderConfig;
use crate::notifier::NotifierConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::uploader::UploaderConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub uploader: UploaderConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: String,
    /// Bot API base URL (overridable for tests)
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-poll timeout for getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// How long a quality selection keyboard stays valid
    #[serde(default = "default_selection_ttl")]
    pub selection_ttl_secs: u64,
    /// Chats allowed to issue commands (empty = any chat)
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_selection_ttl() -> u64 {
    600
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
            selection_ttl_secs: default_selection_ttl(),
            allowed_chat_ids: Vec::new(),
        }
    }

    /// Whether commands from this chat are accepted.
    pub fn is_chat_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chat_ids.is_empty() || self.allowed_chat_ids.contains(&chat_id)
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub telegram: SanitizedTelegramConfig,
    pub downloader: DownloaderConfig,
    pub uploader: UploaderConfig,
    pub notifier: NotifierConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized Telegram config (bot token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub bot_token_configured: bool,
    pub api_base: String,
    pub poll_timeout_secs: u64,
    pub selection_ttl_secs: u64,
    pub allowed_chat_ids: Vec<i64>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            telegram: SanitizedTelegramConfig {
                bot_token_configured: !config.telegram.bot_token.trim().is_empty(),
                api_base: config.telegram.api_base.clone(),
                poll_timeout_secs: config.telegram.poll_timeout_secs,
                selection_ttl_secs: config.telegram.selection_ttl_secs,
                allowed_chat_ids: config.telegram.allowed_chat_ids.clone(),
            },
            downloader: config.downloader.clone(),
            uploader: config.uploader.clone(),
            notifier: config.notifier.clone(),
            orchestrator: config.orchestrator.clone(),
        }
    }
}
