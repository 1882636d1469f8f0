//! Rate limiter for outbound Telegram messages.
//!
//! Telegram throttles bots that send more than about one message per second
//! to the same chat. Each chat gets its own send slot so a busy chat never
//! delays another one.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::session::ChatId;

/// Rate limiter that enforces a minimum interval between sends to one chat.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum duration between two sends to the same chat.
    min_interval: Duration,

    /// Earliest instant the next send to each chat may start.
    next_allowed: DashMap<ChatId, Instant>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_allowed: DashMap::new(),
        }
    }

    /// Reserves the next send slot for `chat_id` and waits for it.
    ///
    /// Concurrent callers for the same chat get consecutive slots.
    /// Returns the duration waited (0 if no wait was needed).
    pub async fn wait_and_acquire(&self, chat_id: ChatId) -> Duration {
        let now = Instant::now();
        let slot = {
            let mut next = self.next_allowed.entry(chat_id).or_insert(now);
            let slot = (*next).max(now);
            *next = slot + self.min_interval;
            slot
        };

        let wait_duration = slot.saturating_duration_since(now);
        if !wait_duration.is_zero() {
            debug!(
                chat_id,
                "Rate limiter: waiting {:?} before next message", wait_duration
            );
            tokio::time::sleep_until(slot).await;
        }

        wait_duration
    }
}
