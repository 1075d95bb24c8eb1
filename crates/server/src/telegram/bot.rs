//! Chat command surface.
//!
//! `/startmedia <URL> [name]` asks for a quality, the quality buttons start a
//! task whose progress is rendered on the same message, and the cancel button
//! on that message cancels the task.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use mediarelay_core::downloader::Quality;
use mediarelay_core::notifier::{Action, MessageRef};
use mediarelay_core::orchestrator::OrchestratorError;
use mediarelay_core::task::{sanitize_display_name, validate_source_url};
use mediarelay_core::{
    StartTaskRequest, TaskId, TaskOrchestrator, TelegramConfig, CANCEL_TOKEN_PREFIX,
};

use super::client::TelegramClient;
use super::error::TelegramError;
use super::selection::{PendingSelection, SelectionStore};
use super::types::{CallbackQuery, InlineKeyboardMarkup, Message, Update};
use crate::metrics::TELEGRAM_UPDATES_TOTAL;

/// Prefix of the callback token bound to a quality button.
pub const QUALITY_TOKEN_PREFIX: &str = "quality_";

const START_COMMAND: &str = "/startmedia";
const USAGE_TEXT: &str = "⚠️ Usage: /startmedia <URL> [optional name]";
const EXPIRED_TEXT: &str = "⌛️ This button has expired. Start a new download.";
const NOT_ACTIVE_TEXT: &str = "❓ Download already finished or cancelled.";
const MAX_ERROR_CHARS: usize = 1000;

/// Delay before polling again after a failed getUpdates.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// A recognised chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartMedia {
        url: Option<String>,
        name: Option<String>,
    },
}

/// A recognised button click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Quality {
        quality: Quality,
        selection_id: String,
    },
    Cancel(TaskId),
}

/// Parses a message text into a command.
///
/// Accepts the `/command@BotName` form used in group chats.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut words = text.split_whitespace();
    let head = words.next()?;
    let command = head.split('@').next().unwrap_or(head);
    if command != START_COMMAND {
        return None;
    }

    let url = words.next().map(str::to_string);
    let name = words.collect::<Vec<_>>().join(" ");
    let name = (!name.is_empty()).then_some(name);
    Some(Command::StartMedia { url, name })
}

/// Parses callback data into a button click.
pub fn parse_callback(data: &str) -> Option<Callback> {
    if let Some(rest) = data.strip_prefix(QUALITY_TOKEN_PREFIX) {
        let (tier, selection_id) = rest.split_once('_')?;
        if selection_id.is_empty() {
            return None;
        }
        return Some(Callback::Quality {
            quality: tier.parse().ok()?,
            selection_id: selection_id.to_string(),
        });
    }

    let id = data.strip_prefix(CANCEL_TOKEN_PREFIX)?;
    TaskId::from_str(id).ok().map(Callback::Cancel)
}

/// Buttons offering every quality tier for a pending selection.
pub fn quality_keyboard(selection_id: &str) -> InlineKeyboardMarkup {
    let actions: Vec<Action> = Quality::OFFERED
        .iter()
        .map(|quality| {
            Action::callback(
                quality.label(),
                format!("{QUALITY_TOKEN_PREFIX}{quality}_{selection_id}"),
            )
        })
        .collect();
    InlineKeyboardMarkup::from_actions(&actions)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Long-polling Telegram bot.
#[derive(Clone)]
pub struct TelegramBot {
    client: Arc<TelegramClient>,
    orchestrator: TaskOrchestrator,
    selections: Arc<SelectionStore>,
    config: Arc<TelegramConfig>,
}

impl TelegramBot {
    pub fn new(
        client: Arc<TelegramClient>,
        orchestrator: TaskOrchestrator,
        config: TelegramConfig,
    ) -> Self {
        Self {
            client,
            orchestrator,
            selections: Arc::new(SelectionStore::new(Duration::from_secs(
                config.selection_ttl_secs,
            ))),
            config: Arc::new(config),
        }
    }

    /// Store of quality prompts awaiting a click.
    pub fn selections(&self) -> Arc<SelectionStore> {
        Arc::clone(&self.selections)
    }

    /// Polls for updates until `shutdown` fires.
    ///
    /// Updates queued while the bot was offline are skipped. Each update is
    /// handled on its own task so a slow title lookup never delays a cancel.
    pub async fn run(self, shutdown: CancellationToken) {
        let handlers = TaskTracker::new();
        let mut offset = self.skip_pending_updates().await;
        info!("Telegram bot polling for updates");

        loop {
            let updates = tokio::select! {
                _ = shutdown.cancelled() => break,
                updates = self.client.get_updates(offset, self.config.poll_timeout_secs) => updates,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let bot = self.clone();
                        handlers.spawn(async move { bot.handle_update(update).await });
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch Telegram updates");
                    let delay = match e {
                        TelegramError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(retry_after_secs)
                        }
                        _ => ERROR_BACKOFF,
                    };
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        handlers.close();
        handlers.wait().await;
        info!("Telegram bot stopped");
    }

    /// Returns the offset just past the newest queued update.
    async fn skip_pending_updates(&self) -> Option<i64> {
        match self.client.get_updates(Some(-1), 0).await {
            Ok(updates) => updates.last().map(|u| u.update_id + 1),
            Err(e) => {
                warn!(error = %e, "Could not skip pending updates");
                None
            }
        }
    }

    pub async fn handle_update(&self, update: Update) {
        if let Some(query) = update.callback_query {
            TELEGRAM_UPDATES_TOTAL
                .with_label_values(&["callback_query"])
                .inc();
            self.handle_callback(query).await;
        } else if let Some(message) = update.message {
            TELEGRAM_UPDATES_TOTAL.with_label_values(&["message"]).inc();
            self.handle_message(message).await;
        } else {
            debug!(update_id = update.update_id, "Ignoring update");
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(command) = message.text.as_deref().and_then(parse_command) else {
            return;
        };
        let chat_id = message.chat.id;
        if !self.config.is_chat_allowed(chat_id) {
            warn!(chat_id, "Command from chat not in allow list");
            return;
        }

        match command {
            Command::StartMedia { url, name } => self.start_media(chat_id, url, name).await,
        }
    }

    async fn start_media(&self, chat_id: i64, url: Option<String>, name: Option<String>) {
        let Some(url) = url else {
            self.reply(chat_id, USAGE_TEXT).await;
            return;
        };
        if validate_source_url(&url).is_err() {
            self.reply(chat_id, &format!("❌ Invalid URL: '{url}'")).await;
            return;
        }

        let raw_name = match name {
            Some(name) => name,
            None => match self.lookup_title(chat_id, &url).await {
                Some(title) => title,
                None => return,
            },
        };
        let Ok(display_name) = sanitize_display_name(&raw_name) else {
            self.reply(chat_id, "❌ The name is empty once invalid characters are removed.")
                .await;
            return;
        };

        let selection_id = self.selections.insert(PendingSelection {
            source_url: url,
            display_name: display_name.clone(),
        });
        let text = format!("🎬 {display_name}\n\n📐 Choose the download quality:");
        if let Err(e) = self
            .client
            .send_message(chat_id, &text, Some(&quality_keyboard(&selection_id)))
            .await
        {
            warn!(chat_id, error = %e, "Failed to send quality prompt");
            self.selections.remove(&selection_id);
        }
    }

    /// Looks up the title, keeping the operator informed.
    async fn lookup_title(&self, chat_id: i64, url: &str) -> Option<String> {
        let status = match self
            .client
            .send_message(chat_id, "🔎 Fetching video title...", None)
            .await
        {
            Ok(message) => Some(message.message_ref()),
            Err(e) => {
                warn!(chat_id, error = %e, "Failed to send status message");
                None
            }
        };

        match self.orchestrator.fetch_title(url).await {
            Ok(title) => {
                if let Some(status) = status {
                    if let Err(e) = self
                        .client
                        .delete_message(status.chat_id, status.message_id)
                        .await
                    {
                        debug!(error = %e, "Failed to delete status message");
                    }
                }
                Some(title)
            }
            Err(e) => {
                warn!(url, error = %e, "Title lookup failed");
                let text = format!(
                    "❌ Could not get the title.\n\n{}",
                    truncate(&e.to_string(), MAX_ERROR_CHARS)
                );
                match status {
                    Some(status) => self.edit(&status, &text).await,
                    None => self.reply(chat_id, &text).await,
                }
                None
            }
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        let callback = query.data.as_deref().and_then(parse_callback);
        let message = query.message.as_ref().map(Message::message_ref);

        if let Some(message) = &message {
            if !self.config.is_chat_allowed(message.chat_id) {
                warn!(chat_id = message.chat_id, "Callback from chat not in allow list");
                self.answer(&query.id, None).await;
                return;
            }
        }

        match callback {
            Some(Callback::Quality {
                quality,
                selection_id,
            }) => {
                self.answer(&query.id, None).await;
                let Some(message) = message else {
                    warn!("Quality callback without a message");
                    return;
                };
                self.start_selected(message, quality, &selection_id).await;
            }
            Some(Callback::Cancel(task_id)) => match self.orchestrator.cancel(&task_id).await {
                Ok(cancelled) => {
                    info!(
                        task_id = %task_id,
                        process_terminated = cancelled.process_terminated,
                        "Task cancelled from chat"
                    );
                    self.answer(&query.id, Some("Cancelling...")).await;
                }
                Err(OrchestratorError::TaskNotFound(_)) => {
                    self.answer(&query.id, Some(NOT_ACTIVE_TEXT)).await;
                }
                Err(e) => {
                    error!(task_id = %task_id, error = %e, "Cancel failed");
                    self.answer(&query.id, None).await;
                }
            },
            None => {
                debug!(data = ?query.data, "Unknown callback data");
                self.answer(&query.id, None).await;
            }
        }
    }

    async fn start_selected(&self, message: MessageRef, quality: Quality, selection_id: &str) {
        let Some(selection) = self.selections.take(selection_id) else {
            self.edit(&message, EXPIRED_TEXT).await;
            return;
        };

        let request = StartTaskRequest {
            source_url: selection.source_url,
            display_name: selection.display_name,
            quality,
            message,
        };
        match self.orchestrator.start_task(request).await {
            Ok(handle) => {
                info!(task_id = %handle.id, chat_id = message.chat_id, %quality, "Task started from chat");
            }
            Err(e) => {
                error!(error = %e, "Failed to start task");
                self.edit(&message, &format!("❌ Could not start the download: {e}"))
                    .await;
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.client.send_message(chat_id, text, None).await {
            warn!(chat_id, error = %e, "Failed to send message");
        }
    }

    async fn edit(&self, message: &MessageRef, text: &str) {
        if let Err(e) = self
            .client
            .edit_message_text(
                message.chat_id,
                message.message_id,
                text,
                &InlineKeyboardMarkup::from_actions(&[]),
            )
            .await
        {
            warn!(message_id = message.message_id, error = %e, "Failed to edit message");
        }
    }

    async fn answer(&self, callback_query_id: &str, text: Option<&str>) {
        if let Err(e) = self
            .client
            .answer_callback_query(callback_query_id, text)
            .await
        {
            debug!(error = %e, "Failed to answer callback query");
        }
    }
}
