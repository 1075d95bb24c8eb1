//! Telegram Bot API client.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use mediarelay_core::TelegramConfig;

use super::error::TelegramError;
use super::types::{ApiResponse, InlineKeyboardMarkup, Message, Update};
use crate::metrics::TELEGRAM_API_ERRORS_TOTAL;

/// Extra time on top of the long-poll timeout before a request is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Thin client over the Bot API methods the relay uses.
pub struct TelegramClient {
    client: Client,
    /// `{api_base}/bot{token}`
    base_url: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs) + POLL_GRACE)
            .build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, TelegramError> {
        debug!(method, "Telegram API call");
        let result = self.send_call(method, &body).await;
        if result.is_err() {
            TELEGRAM_API_ERRORS_TOTAL.with_label_values(&[method]).inc();
        }
        result
    }

    async fn send_call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.post(&url).json(body).send().await?;
        let envelope: ApiResponse<T> = response.json().await?;

        if !envelope.ok {
            let code = envelope.error_code.unwrap_or(0);
            if code == 429 {
                return Err(TelegramError::RateLimited {
                    retry_after_secs: envelope
                        .parameters
                        .and_then(|p| p.retry_after)
                        .unwrap_or(1),
                });
            }
            return Err(TelegramError::Api {
                code,
                description: envelope.description.unwrap_or_default(),
            });
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::InvalidResponse(format!("{method}: missing result")))
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = json!(keyboard);
        }
        self.call("sendMessage", body).await
    }

    /// Replaces the text and keyboard of a message.
    ///
    /// An empty keyboard removes the buttons.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: &InlineKeyboardMarkup,
    ) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "disable_web_page_preview": true,
            "reply_markup": keyboard,
        });
        // Result is the edited Message, or `true` for inline messages
        let _: Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: Value = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id });
        let _: Value = self.call("deleteMessage", body).await?;
        Ok(())
    }
}
