//! Per-session polling task.
//!
//! Each cycle follows a simple state machine:
//! 1. Wait for the next tick, or stop if the cancellation signal fired
//! 2. Snapshot the session; skip the cycle while a value is being entered
//! 3. Fetch the price, append it to the history, send the notification
//! 4. On fetch failure send one error notification and wait for the next tick
//!
//! Cancellation is checked before every cycle and raced against the cycle
//! itself, so no fetch or send starts once the signal has been observed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::format::{fetch_error_notification, price_notification, round_price};
use crate::ports::{BotServices, QuoteError};
use crate::session::{ChatId, SessionHandle, TaskGuard};

/// Repeating price report bound to one session generation.
pub struct PollingTask {
    session: Arc<SessionHandle>,
    services: Arc<BotServices>,
    generation: u64,
    period: Duration,
}

impl PollingTask {
    /// Creates a task reporting every `period`.
    #[must_use]
    pub fn new(
        session: Arc<SessionHandle>,
        services: Arc<BotServices>,
        generation: u64,
        period: Duration,
    ) -> Self {
        Self {
            session,
            services,
            generation,
            period,
        }
    }

    /// Spawns the task; it runs until `cancelled` fires or its sender is dropped.
    #[must_use]
    pub fn spawn(self, cancelled: oneshot::Receiver<()>) -> JoinHandle<()> {
        let guard = self.session.track_task();
        tokio::spawn(self.run(cancelled, guard))
    }

    async fn run(self, mut cancelled: oneshot::Receiver<()>, guard: TaskGuard) {
        let chat_id = self.chat_id();
        let generation = self.generation;

        if guard.live_at_start() > 1 {
            error!(
                chat_id,
                generation,
                live = guard.live_at_start(),
                "Another polling task is already running for this session, exiting"
            );
            return;
        }

        info!(chat_id, generation, period = ?self.period, "Polling task started");

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                () = self.cycle() => {}
            }
        }

        info!(chat_id, generation, "Polling task finished");
        drop(guard);
    }

    /// One fetch-and-notify cycle.
    async fn cycle(&self) {
        let chat_id = self.chat_id();

        let session = self.session.snapshot().await;
        if session.pending_input.is_pending() {
            debug!(chat_id, pending = ?session.pending_input, "Skipping cycle while awaiting input");
            return;
        }

        let asset = &self.services.asset;
        let text = match self.fetch(asset, session.price_scale()).await {
            Ok(price) => price_notification(asset, session.reference_price, &price),
            Err(e) => {
                warn!(chat_id, "Failed to fetch {} price: {}", asset, e);
                fetch_error_notification(&e)
            }
        };

        if let Err(e) = self.services.transport.send(chat_id, &text).await {
            error!(chat_id, "Failed to deliver notification: {}", e);
        }
    }

    /// Fetches and rounds the current price, recording valid quotes.
    async fn fetch(&self, asset: &str, scale: u32) -> Result<rust_decimal::Decimal, QuoteError> {
        let raw = self.services.quotes.fetch_price(asset).await?;
        let price = round_price(&raw, scale)?;

        if let Err(e) = self.services.history.append(asset, Local::now(), &raw).await {
            warn!(chat_id = self.chat_id(), "Failed to record price history: {}", e);
        }

        Ok(price)
    }

    fn chat_id(&self) -> ChatId {
        self.session.chat_id()
    }
}

impl std::fmt::Debug for PollingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingTask")
            .field("chat_id", &self.chat_id())
            .field("generation", &self.generation)
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}
