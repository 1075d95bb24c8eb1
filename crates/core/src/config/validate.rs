use super::{types::Config, ConfigError};
use crate::uploader::CHUNK_ALIGNMENT;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Telegram bot token is set
/// - Upload folder is set and the chunk size is a positive multiple of 256 KiB
/// - Progress channel holds at least one snapshot
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.bot_token cannot be empty".to_string(),
        ));
    }

    if config.telegram.selection_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "telegram.selection_ttl_secs cannot be 0".to_string(),
        ));
    }

    // Uploader validation
    if config.uploader.folder_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "uploader.folder_id cannot be empty".to_string(),
        ));
    }

    let chunk = config.uploader.chunk_size_bytes;
    if chunk == 0 || chunk % CHUNK_ALIGNMENT != 0 {
        return Err(ConfigError::ValidationError(format!(
            "uploader.chunk_size_bytes must be a positive multiple of {CHUNK_ALIGNMENT}, got {chunk}"
        )));
    }

    if config.orchestrator.progress_channel_size == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.progress_channel_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}
