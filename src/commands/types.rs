//! Command types and definitions.

use std::fmt;

/// Available bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Start periodic notifications.
    On,

    /// Stop periodic notifications.
    Off,

    /// Ask for a new reference price.
    SetCoinPrice,

    /// Ask for a new display precision.
    SetCoinPriceScale,

    /// Ask for a new notification interval.
    SetNotificationInterval,

    /// Report the current price once.
    Price,

    /// Show the session settings.
    Status,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Every command, in the order shown to users.
    pub const ALL: [Self; 8] = [
        Self::On,
        Self::Off,
        Self::SetCoinPrice,
        Self::SetCoinPriceScale,
        Self::SetNotificationInterval,
        Self::Price,
        Self::Status,
        Self::Help,
    ];

    /// Parses a command from a message text.
    ///
    /// Matching ignores case, surrounding whitespace and a `@botname` suffix.
    /// Returns `None` if the message is not a known command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let name = text.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _bot)| name);

        match name.to_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "set_coin_price" => Some(Self::SetCoinPrice),
            "set_coin_price_scale" => Some(Self::SetCoinPriceScale),
            "set_notification_interval" => Some(Self::SetNotificationInterval),
            "price" => Some(Self::Price),
            "status" => Some(Self::Status),
            "help" | "start" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name without the leading slash.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::SetCoinPrice => "set_coin_price",
            Self::SetCoinPriceScale => "set_coin_price_scale",
            Self::SetNotificationInterval => "set_notification_interval",
            Self::Price => "price",
            Self::Status => "status",
            Self::Help => "help",
        }
    }

    /// Returns the command description for help and the bot menu.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::On => "Start price notifications",
            Self::Off => "Stop price notifications",
            Self::SetCoinPrice => "Set the saved reference price",
            Self::SetCoinPriceScale => "Set decimal places of the shown price",
            Self::SetNotificationInterval => "Set seconds between notifications",
            Self::Price => "Show the current price now",
            Self::Status => "Show your session settings",
            Self::Help => "Show this help message",
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(BotCommand::parse("/on"), Some(BotCommand::On));
        assert_eq!(BotCommand::parse("/off"), Some(BotCommand::Off));
        assert_eq!(
            BotCommand::parse("/set_coin_price"),
            Some(BotCommand::SetCoinPrice)
        );
        assert_eq!(
            BotCommand::parse("/set_coin_price_scale"),
            Some(BotCommand::SetCoinPriceScale)
        );
        assert_eq!(
            BotCommand::parse("/set_notification_interval"),
            Some(BotCommand::SetNotificationInterval)
        );
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Help));
    }

    #[test]
    fn test_parse_with_bot_suffix() {
        assert_eq!(
            BotCommand::parse("/on@price_notifier_bot"),
            Some(BotCommand::On)
        );
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(BotCommand::parse("/OFF"), Some(BotCommand::Off));
        assert_eq!(BotCommand::parse("/Status"), Some(BotCommand::Status));
    }

    #[test]
    fn test_parse_with_extra_whitespace() {
        assert_eq!(BotCommand::parse("  /price  "), Some(BotCommand::Price));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(BotCommand::parse("on"), None);
        assert_eq!(BotCommand::parse("/onn"), None);
        assert_eq!(BotCommand::parse("/on now"), None);
        assert_eq!(BotCommand::parse("100.5"), None);
        assert_eq!(BotCommand::parse(""), None);
    }

    #[test]
    fn test_round_trips_through_display() {
        for command in BotCommand::ALL {
            assert_eq!(BotCommand::parse(&command.to_string()), Some(command));
        }
    }
}
