//! Operator notifications.
//!
//! Every task owns exactly one message that is edited in place through all
//! phases. The [`NotificationSink`] trait abstracts the "edit a message"
//! capability of the chat front-end, and [`RateLimitedNotifier`] collapses
//! bursts of progress snapshots into at most one visible update per interval.
//!
//! Delivery is best-effort: failures are logged and never reach the task
//! outcome.

mod config;
mod error;
mod rate_limited;
mod render;
mod traits;

pub use config::NotifierConfig;
pub use error::NotifyError;
pub use rate_limited::RateLimitedNotifier;
pub use render::render_progress;
pub use traits::{Action, ActionKind, MessageRef, NotificationSink, NotificationTarget};
