//! Command handling module.
//!
//! Interprets inbound chat messages either as an awaited configuration value
//! or as one of the bot's slash commands.

mod handler;
mod types;

pub use handler::{CommandDispatcher, UNKNOWN_COMMAND_MSG};
pub use types::BotCommand;
