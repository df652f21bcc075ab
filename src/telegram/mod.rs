//! Telegram transport module.
//!
//! Receives chat messages through the Bot API, sends the rendered replies
//! and forwards vote notices to the organiser at a safe pace.

mod client;
mod notifier;
mod rate_limiter;

pub use client::{TelegramBot, TelegramError, main_keyboard};
pub use notifier::{
    AdminChat, AdminNotifier, NoticeSink, NotifierHandle, NotifierMessage, notice_channel,
};
pub use rate_limiter::RateLimiter;
