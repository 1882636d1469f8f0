//! Price rounding and notification text.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::ports::QuoteError;

/// Parses a quoted decimal string and rounds it half-up to `scale` places.
///
/// # Errors
///
/// Returns [`QuoteError::InvalidPrice`] if the quote is not a decimal number.
pub fn round_price(raw: &str, scale: u32) -> Result<Decimal, QuoteError> {
    let raw = raw.trim();
    let price = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| QuoteError::InvalidPrice(raw.to_owned()))?;

    Ok(price.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero))
}

/// Formats the user's reference price; integral values print without `.0`.
#[must_use]
pub fn format_reference_price(price: f64) -> String {
    price.to_string()
}

/// Capitalizes the first letter of an asset name ("bitcoin" -> "Bitcoin").
#[must_use]
pub fn title_case(asset: &str) -> String {
    let mut chars = asset.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Builds the periodic notification comparing the live price to the reference.
#[must_use]
pub fn price_notification(asset: &str, reference_price: f64, price: &Decimal) -> String {
    format!(
        "Saved {asset} price = {}\n{} price now = {price}",
        format_reference_price(reference_price),
        title_case(asset),
    )
}

/// Builds the notification sent when a quote could not be obtained.
#[must_use]
pub fn fetch_error_notification(err: &QuoteError) -> String {
    format!("Error while getting currency price: {err}")
}
