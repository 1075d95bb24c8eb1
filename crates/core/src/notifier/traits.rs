//! Trait definitions for the notifier module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::NotifyError;

/// Identifies the single message the operator sees for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// What happens when the operator clicks an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ActionKind {
    /// An opaque token handed back to the command surface.
    Callback(String),
    /// A link opened by the client.
    Url(String),
}

/// A clickable label attached to a rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub kind: ActionKind,
}

impl Action {
    pub fn callback(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Callback(token.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Url(url.into()),
        }
    }
}

/// Where and how progress for one task is shown.
///
/// Shared read-only between the drivers and the orchestrator for the
/// lifetime of the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub message: MessageRef,
    /// Title shown in every progress render.
    pub title: String,
    /// Actions shown alongside progress renders (e.g. cancel).
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// The "edit a message" capability of the chat front-end.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Returns the name of this sink implementation.
    fn name(&self) -> &str;

    /// Replaces the content of `message` with `text` and the given actions.
    async fn render(
        &self,
        message: &MessageRef,
        text: &str,
        actions: &[Action],
    ) -> Result<(), NotifyError>;
}
