//! Configuration module for the price notifier bot.
//!
//! Handles loading of the bot token and of the deployment settings
//! (tracked asset, quote service, history file, send throttling).

mod settings;

pub use settings::{BotSettings, ConfigError, TelegramConfig};

/// File the bot token is read from when `TELEGRAM_BOT_TOKEN` is unset.
pub const DEFAULT_TOKEN_FILE: &str = "bot_token.txt";

/// Asset tracked when `ASSET_SYMBOL` is unset.
pub const DEFAULT_ASSET_SYMBOL: &str = "bitcoin";

/// Quote service base URL; the asset symbol is appended to it.
pub const DEFAULT_QUOTE_API_URL: &str = "https://api.coincap.io/v2/assets/";

/// Price history file used when `HISTORY_PATH` is unset.
pub const DEFAULT_HISTORY_PATH: &str = "prices_history/Prices_Bitcoin.txt";
