//! Telegram Bot API transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::BotCommand as TgCommand;
use teloxide::RequestError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::RateLimiter;
use crate::commands::{BotCommand, CommandDispatcher};
use crate::config::TelegramConfig;
use crate::ports::{Inbound, Transport, TransportError};

/// Errors raised while setting up the Telegram connection.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Failed to register bot commands: {0}")]
    Commands(String),
}

/// Bot API client with per-chat send throttling.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    rate_limiter: Arc<RateLimiter>,
}

impl TelegramTransport {
    /// Creates a transport and checks the token with `getMe`.
    ///
    /// # Errors
    ///
    /// Returns an error if Telegram rejects the token or is unreachable.
    pub async fn connect(
        config: &TelegramConfig,
        min_send_interval: Duration,
    ) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram Bot API...");

        let bot = Bot::new(config.bot_token.clone());
        let me = bot
            .get_me()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!(
            "Connected as @{}",
            me.user.username.as_deref().unwrap_or("unknown")
        );

        Ok(Self::new(bot, min_send_interval))
    }

    /// Wraps an existing bot handle without contacting Telegram.
    #[must_use]
    pub fn new(bot: Bot, min_send_interval: Duration) -> Self {
        Self {
            bot,
            rate_limiter: Arc::new(RateLimiter::new(min_send_interval)),
        }
    }

    /// Publishes the command list shown in the client's "/" menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the Bot API call fails.
    pub async fn register_commands(&self) -> Result<(), TelegramError> {
        let commands: Vec<TgCommand> = BotCommand::ALL
            .iter()
            .map(|cmd| TgCommand::new(cmd.name(), cmd.description()))
            .collect();

        self.bot
            .set_my_commands(commands)
            .await
            .map_err(|e| TelegramError::Commands(e.to_string()))?;

        info!("Registered {} bot commands", BotCommand::ALL.len());
        Ok(())
    }

    /// Receives updates until Ctrl+C, handing each text message to `dispatcher`.
    pub async fn run(&self, dispatcher: Arc<CommandDispatcher>) {
        info!("Listening for messages");

        teloxide::repl(self.bot.clone(), move |msg: Message| {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                let Some(inbound) = inbound_from(&msg) else {
                    debug!(chat_id = msg.chat.id.0, "Ignoring non-text message");
                    return respond(());
                };

                if let Err(e) = dispatcher.handle(&inbound).await {
                    error!("Failed to reply: {}", e);
                }

                respond(())
            }
        })
        .await;

        info!("Update listener stopped");
    }

    async fn send_once(&self, chat_id: i64, text: &str) -> Result<(), RequestError> {
        self.rate_limiter.wait_and_acquire(chat_id).await;
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        debug!(chat_id, "Sending: \"{}\"", truncate_for_log(text, 30));

        let result = match self.send_once(chat_id, text).await {
            Err(RequestError::RetryAfter(secs)) => {
                warn!(
                    chat_id,
                    "Received flood wait from Telegram: {:?}",
                    secs.duration()
                );
                tokio::time::sleep(secs.duration()).await;
                self.send_once(chat_id, text).await
            }
            other => other,
        };

        result.map_err(|e| TransportError::Send {
            chat_id,
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Converts a text message; the sender is the posting user, not the chat.
fn inbound_from(msg: &Message) -> Option<Inbound> {
    Some(Inbound {
        chat_id: msg.chat.id.0,
        text: msg.text()?.to_owned(),
        sender: msg.from.as_ref().and_then(|user| user.username.clone()),
    })
}

/// Truncates a string for logging.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("Hello", 10), "Hello");
        assert_eq!(truncate_for_log("Hello, World!", 5), "Hello...");
        assert_eq!(truncate_for_log("Цена ₿ сейчас", 4), "Цена...");
    }

    fn group_message(text: Option<&str>) -> Message {
        let mut json = serde_json::json!({
            "message_id": 42,
            "date": 1_718_000_000,
            "chat": {
                "id": -100_123,
                "type": "supergroup",
                "title": "Traders",
                "username": "traders_group"
            },
            "from": {
                "id": 555,
                "is_bot": false,
                "first_name": "Sam",
                "username": "sam_trades"
            }
        });
        if let Some(text) = text {
            json["text"] = serde_json::Value::from(text);
        } else {
            json["location"] = serde_json::json!({
                "latitude": 51.5,
                "longitude": -0.12
            });
        }
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_inbound_uses_sender_not_chat_handle() {
        let inbound = inbound_from(&group_message(Some("/price"))).unwrap();
        assert_eq!(inbound.chat_id, -100_123);
        assert_eq!(inbound.text, "/price");
        assert_eq!(inbound.sender.as_deref(), Some("sam_trades"));
    }

    #[test]
    fn test_inbound_skips_non_text() {
        assert!(inbound_from(&group_message(None)).is_none());
    }

    #[test]
    fn test_debug_hides_bot() {
        let transport = TelegramTransport::new(Bot::new("123:secret"), Duration::from_secs(1));
        assert!(!format!("{transport:?}").contains("secret"));
    }
}
