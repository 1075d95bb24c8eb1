//! HTTP admin API and Telegram front end for the media relay.

pub mod api;
pub mod metrics;
pub mod state;
pub mod telegram;
