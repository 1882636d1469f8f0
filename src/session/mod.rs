//! Per-user sessions and their lifecycle.
//!
//! A session is created on the first `/on` of a chat and lives for the whole
//! process. Its polling task is started, restarted and stopped through the
//! [`SessionRegistry`].

mod registry;
mod state;

pub use registry::{SessionError, SessionHandle, SessionRegistry, TaskGuard};
pub use state::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PRICE_SCALE, InputError, MAX_POLL_INTERVAL_SECS,
    MAX_PRICE_SCALE, MIN_POLL_INTERVAL_SECS, MIN_PRICE_SCALE, PendingInput, UserSession,
    parse_integer, parse_price, validate_interval,
};

/// Opaque chat identifier keying a session.
pub type ChatId = i64;
