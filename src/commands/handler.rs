//! Command dispatcher implementation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::types::BotCommand;
use crate::format::{fetch_error_notification, format_reference_price, round_price, title_case};
use crate::ports::{BotServices, Inbound, TransportError};
use crate::session::{
    ChatId, DEFAULT_PRICE_SCALE, MAX_POLL_INTERVAL_SECS, MAX_PRICE_SCALE, MIN_POLL_INTERVAL_SECS,
    MIN_PRICE_SCALE, PendingInput, SessionError, SessionRegistry, parse_integer, parse_price,
};

/// Reply to text that is neither a command nor an awaited value.
pub const UNKNOWN_COMMAND_MSG: &str = "Unknown command. Send /help to see available commands.";

/// Routes inbound messages to session updates and lifecycle transitions.
///
/// Safe to call concurrently; every message gets exactly one reply.
pub struct CommandDispatcher {
    registry: Arc<SessionRegistry>,
}

impl CommandDispatcher {
    /// Creates a dispatcher over the given registry.
    #[must_use]
    pub const fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher mutates.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn services(&self) -> &BotServices {
        self.registry.services()
    }

    /// Handles one inbound message and sends the reply.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the reply could not be sent.
    pub async fn handle(&self, message: &Inbound) -> Result<(), TransportError> {
        info!(
            chat_id = message.chat_id,
            sender = message.sender.as_deref().unwrap_or("unknown"),
            "Received message: {}",
            truncate(&message.text.replace('\n', " "), 64)
        );

        let reply = self.respond(message.chat_id, &message.text).await;
        self.services().transport.send(message.chat_id, &reply).await
    }

    /// Computes the reply to a message, applying its effects.
    ///
    /// An awaited configuration value takes priority over command parsing.
    pub async fn respond(&self, chat_id: ChatId, text: &str) -> String {
        if let Some(reply) = self.resolve_pending(chat_id, text).await {
            return reply;
        }

        let Some(command) = BotCommand::parse(text) else {
            debug!(chat_id, "Unknown command");
            return UNKNOWN_COMMAND_MSG.to_owned();
        };

        debug!(chat_id, "Handling command: {}", command);
        self.execute(chat_id, command).await
    }

    /// Consumes the message as the awaited value, if one is awaited.
    async fn resolve_pending(&self, chat_id: ChatId, text: &str) -> Option<String> {
        let handle = self.registry.get(chat_id)?;
        let mut session = handle.lock().await;
        let pending = std::mem::take(&mut session.pending_input);

        let reply = match pending {
            PendingInput::None => return None,
            PendingInput::SetPrice => match parse_price(text) {
                Ok(price) => {
                    session.reference_price = price;
                    format!(
                        "Successfully changed coin price to: {}",
                        format_reference_price(price)
                    )
                }
                Err(e) => e.to_string(),
            },
            PendingInput::SetScale => {
                match parse_integer(text).and_then(|scale| session.set_price_scale(scale)) {
                    Ok(scale) => format!("Successfully changed coin price scale to: {scale}"),
                    Err(e) => e.to_string(),
                }
            }
            PendingInput::SetInterval => {
                // The restart takes the task slot, which ranks above the field lock.
                drop(session);
                match parse_integer(text) {
                    Ok(secs) => match self.registry.set_poll_interval(chat_id, secs).await {
                        Ok(secs) => format!("Successfully changed interval to: {secs}"),
                        Err(e) => e.to_string(),
                    },
                    Err(e) => e.to_string(),
                }
            }
        };

        info!(chat_id, ?pending, "Resolved pending input: {}", reply);
        Some(reply)
    }

    /// Executes a parsed command.
    async fn execute(&self, chat_id: ChatId, command: BotCommand) -> String {
        match command {
            BotCommand::On => self.handle_on(chat_id).await,
            BotCommand::Off => self.handle_off(chat_id).await,
            BotCommand::SetCoinPrice => {
                self.request_input(chat_id, PendingInput::SetPrice, "Send float price value".to_owned())
                    .await
            }
            BotCommand::SetCoinPriceScale => {
                let prompt = format!(
                    "Send coin price scale value that must be {MIN_PRICE_SCALE} <= scale <= {MAX_PRICE_SCALE}"
                );
                self.request_input(chat_id, PendingInput::SetScale, prompt).await
            }
            BotCommand::SetNotificationInterval => {
                let prompt = format!(
                    "Send seconds interval that must be {MIN_POLL_INTERVAL_SECS} <= interval <= {MAX_POLL_INTERVAL_SECS}"
                );
                self.request_input(chat_id, PendingInput::SetInterval, prompt).await
            }
            BotCommand::Price => self.handle_price(chat_id).await,
            BotCommand::Status => self.handle_status(chat_id).await,
            BotCommand::Help => handle_help(),
        }
    }

    async fn handle_on(&self, chat_id: ChatId) -> String {
        match self.registry.activate(chat_id).await {
            Ok(secs) => format!(
                "Session started, {} price will be sent every {secs} seconds",
                self.services().asset
            ),
            Err(e) => e.to_string(),
        }
    }

    async fn handle_off(&self, chat_id: ChatId) -> String {
        match self.registry.deactivate(chat_id).await {
            Ok(()) => "Successfully stopped session".to_owned(),
            Err(e) => e.to_string(),
        }
    }

    /// Arms the session to treat the next message as a configuration value.
    async fn request_input(&self, chat_id: ChatId, pending: PendingInput, prompt: String) -> String {
        let Some(handle) = self.registry.get(chat_id) else {
            return SessionError::NoActiveSession.to_string();
        };

        let mut session = handle.lock().await;
        if !session.active {
            return SessionError::NoActiveSession.to_string();
        }

        session.pending_input = pending;
        prompt
    }

    async fn handle_price(&self, chat_id: ChatId) -> String {
        let scale = match self.registry.get(chat_id) {
            Some(handle) => handle.snapshot().await.price_scale(),
            None => DEFAULT_PRICE_SCALE,
        };

        let asset = &self.services().asset;
        let rounded = self
            .services()
            .quotes
            .fetch_price(asset)
            .await
            .and_then(|raw| round_price(&raw, scale));

        match rounded {
            Ok(price) => format!("{} price now = {price}", title_case(asset)),
            Err(e) => {
                warn!(chat_id, "Failed to fetch {} price: {}", asset, e);
                fetch_error_notification(&e)
            }
        }
    }

    async fn handle_status(&self, chat_id: ChatId) -> String {
        let Some(handle) = self.registry.get(chat_id) else {
            return SessionError::NoActiveSession.to_string();
        };
        let session = handle.snapshot().await;

        let state = if session.active { "▶ Running" } else { "⏸ Stopped" };
        let awaiting = match session.pending_input {
            PendingInput::None => "nothing",
            PendingInput::SetPrice => "price",
            PendingInput::SetScale => "scale",
            PendingInput::SetInterval => "interval",
        };

        format!(
            "Status: {state}\n\
             Asset: {}\n\
             Saved price: {}\n\
             Price scale: {}\n\
             Interval: {}s\n\
             Awaiting: {awaiting}",
            self.services().asset,
            format_reference_price(session.reference_price),
            session.price_scale(),
            session.poll_interval_secs(),
        )
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

fn handle_help() -> String {
    let mut lines = vec!["Price Notifier Bot commands:".to_owned(), String::new()];
    for command in BotCommand::ALL {
        lines.push(format!("  {command} - {}", command.description()));
    }
    lines.join("\n")
}

/// Truncates a string to a maximum length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
