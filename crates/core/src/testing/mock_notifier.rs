//! Mock notification sink for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notifier::{Action, MessageRef, NotificationSink, NotifyError};

/// A render that reached the mock sink.
#[derive(Debug, Clone)]
pub struct RecordedRender {
    pub message: MessageRef,
    pub text: String,
    pub actions: Vec<Action>,
}

/// Mock implementation of the NotificationSink trait.
///
/// Records every successful render and can be configured to fail all
/// deliveries.
#[derive(Debug, Default)]
pub struct MockNotificationSink {
    renders: Arc<RwLock<Vec<RecordedRender>>>,
    attempts: Arc<RwLock<usize>>,
    failure: Arc<RwLock<Option<NotifyError>>>,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All successful renders, oldest first.
    pub async fn recorded_renders(&self) -> Vec<RecordedRender> {
        self.renders.read().await.clone()
    }

    /// Successful renders of one message.
    pub async fn renders_for(&self, message: &MessageRef) -> Vec<RecordedRender> {
        self.renders
            .read()
            .await
            .iter()
            .filter(|r| &r.message == message)
            .cloned()
            .collect()
    }

    pub async fn render_count(&self) -> usize {
        self.renders.read().await.len()
    }

    /// Render calls including failed ones.
    pub async fn attempt_count(&self) -> usize {
        *self.attempts.read().await
    }

    pub async fn last_text(&self) -> Option<String> {
        self.renders.read().await.last().map(|r| r.text.clone())
    }

    pub async fn last_render(&self) -> Option<RecordedRender> {
        self.renders.read().await.last().cloned()
    }

    /// Make every following render fail with `error`.
    pub async fn set_failure(&self, error: NotifyError) {
        *self.failure.write().await = Some(error);
    }

    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }
}

#[async_trait]
impl NotificationSink for MockNotificationSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(
        &self,
        message: &MessageRef,
        text: &str,
        actions: &[Action],
    ) -> Result<(), NotifyError> {
        *self.attempts.write().await += 1;

        if let Some(err) = self.failure.read().await.clone() {
            return Err(err);
        }

        self.renders.write().await.push(RecordedRender {
            message: *message,
            text: text.to_string(),
            actions: actions.to_vec(),
        });
        Ok(())
    }
}
