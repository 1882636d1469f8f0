//! Price Notifier Bot Library
//!
//! A Telegram bot that periodically reports the price of a crypto asset
//! to every chat that started a session.
//!
//! This crate provides the core functionality for:
//! - Per-chat sessions with a reference price, display scale and interval
//! - One cancellable polling task per active session
//! - Parsing and dispatching chat commands and awaited values
//! - Fetching quotes and recording them to a history file
//! - Delivering messages through the Telegram Bot API

pub mod commands;
pub mod config;
pub mod format;
pub mod ports;
pub mod quote;
pub mod scheduler;
pub mod session;
pub mod telegram;

#[cfg(test)]
mod testing;
