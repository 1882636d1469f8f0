//! In-memory collaborators for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::time::Instant;

use crate::ports::{
    BotServices, HistoryError, HistoryLog, PriceSource, QuoteError, Transport, TransportError,
};
use crate::session::ChatId;

/// A message captured by [`FakeTransport`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub at: Instant,
}

/// Records every sent message with its (virtual) send time.
#[derive(Debug, Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl FakeTransport {
    pub async fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent to `chat_id`, in order.
    pub async fn texts(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Periodic price notifications sent to `chat_id`.
    pub async fn notifications(&self, chat_id: ChatId) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id && m.text.starts_with("Saved "))
            .cloned()
            .collect()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Send {
                chat_id,
                reason: "transport down".to_owned(),
            });
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_owned(),
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Returns a fixed quote, optionally slow or failing selected calls.
#[derive(Debug)]
pub struct FakeQuotes {
    price: Mutex<String>,
    calls: AtomicUsize,
    failing_calls: Mutex<Vec<usize>>,
    delay: Mutex<Duration>,
}

impl Default for FakeQuotes {
    fn default() -> Self {
        Self {
            price: Mutex::new("67000.4567".to_owned()),
            calls: AtomicUsize::new(0),
            failing_calls: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
        }
    }
}

impl FakeQuotes {
    pub fn set_price(&self, price: &str) {
        *self.price.lock().unwrap() = price.to_owned();
    }

    /// Makes the `n`-th call (1-based) fail.
    pub fn fail_call(&self, n: usize) {
        self.failing_calls.lock().unwrap().push(n);
    }

    /// Makes every call take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for FakeQuotes {
    async fn fetch_price(&self, _symbol: &str) -> Result<String, QuoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing_calls.lock().unwrap().contains(&call) {
            return Err(QuoteError::Status(503));
        }
        Ok(self.price.lock().unwrap().clone())
    }
}

/// Keeps appended `(symbol, price)` pairs in memory.
#[derive(Debug, Default)]
pub struct FakeHistory {
    entries: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl FakeHistory {
    pub async fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl HistoryLog for FakeHistory {
    async fn append(
        &self,
        symbol: &str,
        _timestamp: DateTime<Local>,
        price: &str,
    ) -> Result<(), HistoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HistoryError::Io(std::io::Error::other("disk full")));
        }
        self.entries
            .lock()
            .unwrap()
            .push((symbol.to_owned(), price.to_owned()));
        Ok(())
    }
}

/// All fakes plus the [`BotServices`] bundle built from them.
#[derive(Debug, Default)]
pub struct FakeServices {
    pub transport: Arc<FakeTransport>,
    pub quotes: Arc<FakeQuotes>,
    pub history: Arc<FakeHistory>,
}

impl FakeServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self) -> Arc<BotServices> {
        Arc::new(BotServices::new(
            Arc::clone(&self.transport) as Arc<dyn Transport>,
            Arc::clone(&self.quotes) as Arc<dyn PriceSource>,
            Arc::clone(&self.history) as Arc<dyn HistoryLog>,
            "bitcoin",
        ))
    }
}
