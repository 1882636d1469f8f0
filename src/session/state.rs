//! Per-user session state and input validation.

use thiserror::Error;

/// Smallest accepted price scale (decimal places).
pub const MIN_PRICE_SCALE: u32 = 0;

/// Largest accepted price scale (decimal places).
pub const MAX_PRICE_SCALE: u32 = 16;

/// Shortest accepted notification interval in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 2;

/// Longest accepted notification interval in seconds (one day).
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

/// Price scale applied to new sessions.
pub const DEFAULT_PRICE_SCALE: u32 = 2;

/// Notification interval applied to new sessions.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Which value the next free-form message will populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingInput {
    /// The next message is parsed as a command.
    #[default]
    None,
    /// The next message is the reference price.
    SetPrice,
    /// The next message is the price scale.
    SetScale,
    /// The next message is the notification interval.
    SetInterval,
}

impl PendingInput {
    /// Returns true if a configuration value is awaited.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Rejected user-supplied configuration value.
///
/// The `Display` text is sent back to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Cannot parse {0} to float")]
    NotAFloat(String),

    #[error("Cannot parse {0} to int")]
    NotAnInteger(String),

    #[error("Scale must be 0 <= scale <= 16")]
    ScaleOutOfRange(i64),

    #[error("Interval must be 2 <= interval <= 86400")]
    IntervalOutOfRange(i64),
}

/// Subscription state of one chat.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSession {
    /// Baseline price chosen by the user.
    pub reference_price: f64,

    price_scale: u32,

    poll_interval_secs: u64,

    /// Whether a polling task is running or starting for this session.
    pub active: bool,

    /// Value expected from the next free-form message.
    pub pending_input: PendingInput,
}

impl Default for UserSession {
    fn default() -> Self {
        Self {
            reference_price: 0.0,
            price_scale: DEFAULT_PRICE_SCALE,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            active: false,
            pending_input: PendingInput::None,
        }
    }
}

impl UserSession {
    /// Creates a session with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decimal places used when displaying fetched prices.
    #[must_use]
    pub const fn price_scale(&self) -> u32 {
        self.price_scale
    }

    /// Seconds between two notifications.
    #[must_use]
    pub const fn poll_interval_secs(&self) -> u64 {
        self.poll_interval_secs
    }

    /// Sets the price scale, rejecting values outside `0..=16`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::ScaleOutOfRange`] and leaves the field unchanged.
    pub fn set_price_scale(&mut self, scale: i64) -> Result<u32, InputError> {
        let scale = u32::try_from(scale)
            .ok()
            .filter(|s| (MIN_PRICE_SCALE..=MAX_PRICE_SCALE).contains(s))
            .ok_or(InputError::ScaleOutOfRange(scale))?;
        self.price_scale = scale;
        Ok(scale)
    }

    /// Sets the notification interval, rejecting values outside `2..=86400`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::IntervalOutOfRange`] and leaves the field unchanged.
    pub fn set_poll_interval_secs(&mut self, secs: i64) -> Result<u64, InputError> {
        let secs = validate_interval(secs)?;
        self.poll_interval_secs = secs;
        Ok(secs)
    }

    /// Leaves the active state, dropping any half-finished reconfiguration.
    pub fn mark_inactive(&mut self) {
        self.active = false;
        self.pending_input = PendingInput::None;
    }
}

/// Checks an interval against `2..=86400` without touching any session.
///
/// # Errors
///
/// Returns [`InputError::IntervalOutOfRange`] for out-of-bounds values.
pub fn validate_interval(secs: i64) -> Result<u64, InputError> {
    u64::try_from(secs)
        .ok()
        .filter(|s| (MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(s))
        .ok_or(InputError::IntervalOutOfRange(secs))
}

/// Parses a reference price. Any finite float is accepted.
///
/// # Errors
///
/// Returns [`InputError::NotAFloat`] for unparsable or non-finite input.
pub fn parse_price(text: &str) -> Result<f64, InputError> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| InputError::NotAFloat(text.to_owned()))
}

/// Parses an integer setting (scale or interval) before range checks.
///
/// # Errors
///
/// Returns [`InputError::NotAnInteger`] for unparsable input.
pub fn parse_integer(text: &str) -> Result<i64, InputError> {
    let text = text.trim();
    text.parse::<i64>()
        .map_err(|_| InputError::NotAnInteger(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session() {
        let session = UserSession::new();
        assert!((session.reference_price - 0.0).abs() < f64::EPSILON);
        assert_eq!(session.price_scale(), 2);
        assert_eq!(session.poll_interval_secs(), 3);
        assert!(!session.active);
        assert_eq!(session.pending_input, PendingInput::None);
    }

    #[test]
    fn test_scale_bounds() {
        let mut session = UserSession::new();
        assert_eq!(session.set_price_scale(17), Err(InputError::ScaleOutOfRange(17)));
        assert_eq!(session.set_price_scale(-1), Err(InputError::ScaleOutOfRange(-1)));
        assert_eq!(session.price_scale(), 2);

        assert_eq!(session.set_price_scale(16), Ok(16));
        assert_eq!(session.set_price_scale(0), Ok(0));
        assert_eq!(session.price_scale(), 0);
    }

    #[test]
    fn test_interval_bounds() {
        let mut session = UserSession::new();
        assert!(session.set_poll_interval_secs(1).is_err());
        assert!(session.set_poll_interval_secs(86_401).is_err());
        assert!(session.set_poll_interval_secs(-5).is_err());
        assert_eq!(session.poll_interval_secs(), 3);

        assert_eq!(session.set_poll_interval_secs(2), Ok(2));
        assert_eq!(session.set_poll_interval_secs(86_400), Ok(86_400));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("100.5"), Ok(100.5));
        assert_eq!(parse_price(" -3 "), Ok(-3.0));
        assert_eq!(parse_price("1e3"), Ok(1000.0));
        assert!(parse_price("abc").is_err());
        assert!(parse_price("NaN").is_err());
        assert!(parse_price("inf").is_err());
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Ok(42));
        assert_eq!(parse_integer("-1"), Ok(-1));
        assert_eq!(
            parse_integer("4.2"),
            Err(InputError::NotAnInteger("4.2".to_owned()))
        );
    }

    #[test]
    fn test_mark_inactive_clears_pending() {
        let mut session = UserSession::new();
        session.active = true;
        session.pending_input = PendingInput::SetScale;
        session.mark_inactive();
        assert!(!session.active);
        assert!(!session.pending_input.is_pending());
    }

    #[test]
    fn test_error_messages_name_range() {
        assert_eq!(
            InputError::ScaleOutOfRange(17).to_string(),
            "Scale must be 0 <= scale <= 16"
        );
        assert_eq!(
            InputError::IntervalOutOfRange(1).to_string(),
            "Interval must be 2 <= interval <= 86400"
        );
    }
}
