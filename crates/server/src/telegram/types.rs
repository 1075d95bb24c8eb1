//! Telegram Bot API wire types.
//!
//! Only the fields the relay reads or writes are modelled; unknown fields are
//! ignored on deserialization.

use serde::{Deserialize, Serialize};

use mediarelay_core::notifier::{Action, ActionKind, MessageRef};

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.chat.id, self.message_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    /// The message the clicked keyboard belongs to.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineKeyboardMarkup {
    /// One button per row, in order.
    pub fn from_actions(actions: &[Action]) -> Self {
        Self {
            inline_keyboard: actions
                .iter()
                .map(|action| vec![InlineKeyboardButton::from(action)])
                .collect(),
        }
    }
}

impl From<&Action> for InlineKeyboardButton {
    fn from(action: &Action) -> Self {
        let (callback_data, url) = match &action.kind {
            ActionKind::Callback(token) => (Some(token.clone()), None),
            ActionKind::Url(url) => (None, Some(url.clone())),
        };
        Self {
            text: action.label.clone(),
            callback_data,
            url,
        }
    }
}
