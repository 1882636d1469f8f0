//! Telegram transport module.
//!
//! Connects to the Bot API, feeds incoming text messages to the command
//! dispatcher and delivers replies and notifications with per-chat
//! rate limiting.

mod client;
mod rate_limiter;

pub use client::{TelegramError, TelegramTransport};
pub use rate_limiter::RateLimiter;
