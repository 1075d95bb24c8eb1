//! Chat message sink backed by the Bot API.

use std::sync::Arc;

use async_trait::async_trait;

use mediarelay_core::notifier::{Action, MessageRef, NotificationSink, NotifyError};

use super::client::TelegramClient;
use super::types::InlineKeyboardMarkup;

/// Renders progress by editing the operator's message in place.
pub struct TelegramSink {
    client: Arc<TelegramClient>,
}

impl TelegramSink {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn render(
        &self,
        message: &MessageRef,
        text: &str,
        actions: &[Action],
    ) -> Result<(), NotifyError> {
        let keyboard = InlineKeyboardMarkup::from_actions(actions);
        self.client
            .edit_message_text(message.chat_id, message.message_id, text, &keyboard)
            .await
            .map_err(NotifyError::from)
    }
}
