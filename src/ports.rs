//! Interfaces to the collaborators around the session core.
//!
//! The chat transport, the price quote service and the price history log are
//! reached only through these traits, so the dispatcher and the polling tasks
//! can be driven by in-memory fakes in tests.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::session::ChatId;

/// A text message received from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Chat the message came from; identifies the session.
    pub chat_id: ChatId,
    /// Raw message body.
    pub text: String,
    /// Sender handle, used for logging only.
    pub sender: Option<String>,
}

impl Inbound {
    /// Creates an inbound message without a sender handle.
    #[must_use]
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            sender: None,
        }
    }
}

/// Failure to deliver an outbound message.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to send message to chat {chat_id}: {reason}")]
    Send { chat_id: ChatId, reason: String },
}

/// Failure to obtain a price quote.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Request failed: {0}")]
    Http(String),

    #[error("Unexpected response status: {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid price value: {0}")]
    InvalidPrice(String),
}

/// Failure to append to the price history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a text message to a chat.
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError>;
}

/// Price quote service.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the current price of `symbol` as a decimal string.
    async fn fetch_price(&self, symbol: &str) -> Result<String, QuoteError>;
}

/// Best-effort record of fetched prices.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    /// Appends one fetched price.
    async fn append(
        &self,
        symbol: &str,
        timestamp: DateTime<Local>,
        price: &str,
    ) -> Result<(), HistoryError>;
}

/// Collaborators shared by the dispatcher and every polling task.
#[derive(Clone)]
pub struct BotServices {
    pub transport: Arc<dyn Transport>,
    pub quotes: Arc<dyn PriceSource>,
    pub history: Arc<dyn HistoryLog>,
    /// Tracked asset, fixed per deployment.
    pub asset: String,
}

impl BotServices {
    /// Bundles the collaborators for the given asset.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        quotes: Arc<dyn PriceSource>,
        history: Arc<dyn HistoryLog>,
        asset: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            quotes,
            history,
            asset: asset.into(),
        }
    }
}

impl fmt::Debug for BotServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotServices")
            .field("asset", &self.asset)
            .finish_non_exhaustive()
    }
}
