//! Telegram front end: Bot API client, the notification sink used for
//! progress messages, and the command bot.

mod bot;
mod client;
mod error;
mod selection;
mod sink;
mod types;

pub use bot::{
    parse_callback, parse_command, quality_keyboard, Callback, Command, TelegramBot,
    QUALITY_TOKEN_PREFIX,
};
pub use client::TelegramClient;
pub use error::TelegramError;
pub use selection::{PendingSelection, SelectionStore};
pub use sink::TelegramSink;
pub use types::{
    ApiResponse, CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message,
    ResponseParameters, Update,
};
