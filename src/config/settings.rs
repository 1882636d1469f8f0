//! Application settings and Telegram configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{
    DEFAULT_ASSET_SYMBOL, DEFAULT_HISTORY_PATH, DEFAULT_QUOTE_API_URL, DEFAULT_TOKEN_FILE,
};

/// Telegram Bot API configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token issued by `@BotFather`.
    pub bot_token: String,
}

impl TelegramConfig {
    /// Creates a new Telegram configuration.
    #[must_use]
    pub const fn new(bot_token: String) -> Self {
        Self { bot_token }
    }

    /// Loads the bot token.
    ///
    /// `TELEGRAM_BOT_TOKEN` takes precedence; otherwise the token is read from
    /// `token_file` (default `bot_token.txt`) and trimmed.
    ///
    /// # Errors
    ///
    /// Returns an error if neither source yields a non-empty token.
    pub fn load(token_file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN")
            && !token.trim().is_empty()
        {
            return Ok(Self::new(token.trim().to_owned()));
        }

        let path = token_file.map_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE), Path::to_path_buf);
        Self::from_file(&path)
    }

    /// Reads the bot token from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is empty.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let token = std::fs::read_to_string(path).map_err(|source| ConfigError::TokenFile {
            path: path.to_path_buf(),
            source,
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingToken);
        }

        Ok(Self::new(token.to_owned()))
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

/// Bot-specific settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Asset tracked by every session (quote service identifier).
    pub asset_symbol: String,

    /// Base URL of the quote service; the asset symbol is appended.
    pub quote_api_url: String,

    /// Optional bearer key for the quote service.
    pub quote_api_key: Option<String>,

    /// Timeout of a single quote request in seconds.
    pub quote_timeout_secs: u64,

    /// File receiving one line per fetched price.
    pub history_path: PathBuf,

    /// Minimum spacing between two messages to the same chat, in milliseconds.
    pub send_min_interval_ms: u64,
}

const DEFAULT_QUOTE_TIMEOUT_SECS: u64 = 10;

/// Telegram allows about one message per second per chat.
const DEFAULT_SEND_MIN_INTERVAL_MS: u64 = 1000;

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            asset_symbol: DEFAULT_ASSET_SYMBOL.to_owned(),
            quote_api_url: DEFAULT_QUOTE_API_URL.to_owned(),
            quote_api_key: None,
            quote_timeout_secs: DEFAULT_QUOTE_TIMEOUT_SECS,
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            send_min_interval_ms: DEFAULT_SEND_MIN_INTERVAL_MS,
        }
    }
}

impl BotSettings {
    /// Creates bot settings from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but not a valid number.
    pub fn from_env_with_defaults() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            asset_symbol: std::env::var("ASSET_SYMBOL").unwrap_or(defaults.asset_symbol),
            quote_api_url: std::env::var("QUOTE_API_URL").unwrap_or(defaults.quote_api_url),
            quote_api_key: std::env::var("QUOTE_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            quote_timeout_secs: parse_number(
                "QUOTE_TIMEOUT_SECS",
                std::env::var("QUOTE_TIMEOUT_SECS").ok(),
                defaults.quote_timeout_secs,
            )?,
            history_path: std::env::var("HISTORY_PATH")
                .map_or(defaults.history_path, PathBuf::from),
            send_min_interval_ms: parse_number(
                "SEND_MIN_INTERVAL_MS",
                std::env::var("SEND_MIN_INTERVAL_MS").ok(),
                defaults.send_min_interval_ms,
            )?,
        })
    }

    /// Quote request timeout.
    #[must_use]
    pub const fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    /// Minimum spacing between messages to one chat.
    #[must_use]
    pub const fn send_min_interval(&self) -> Duration {
        Duration::from_millis(self.send_min_interval_ms)
    }
}

/// Parses an optional numeric variable; unset or blank yields `default`.
fn parse_number(var: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        _ => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Bot token is empty; set TELEGRAM_BOT_TOKEN or fill the token file")]
    MissingToken,

    #[error("Failed to read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}
