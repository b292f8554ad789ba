//! Decimal-string <-> shifted fixed-point price conversion.
//!
//! Prices cross the protocol boundary as decimal strings with up to four
//! fractional digits (`"23.45"`, `"412"`, `"0.3854"`) and live inside the
//! engine as `i32`, shifted by 10,000 so every comparison is exact integer
//! comparison.

use thiserror::Error;

use crate::types::Price;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price '{0}' is not a valid decimal number")]
    NotANumber(String),
    #[error("price '{0}' has more than four fractional digits")]
    TooManyFractionalDigits(String),
    #[error("price '{0}' overflows a 32-bit shifted price")]
    Overflow(String),
}

/// Parses a decimal price string into its shifted `i32` representation.
///
/// `"23.45" -> 234500`, `"45.95" -> 459500`, `"412" -> 4120000`. The
/// fractional part is right-padded with zeros to exactly four digits.
pub fn parse_price(raw: &str) -> Result<Price, PriceError> {
    let (whole, frac) = match raw.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (raw, ""),
    };

    if frac.len() > 4 {
        return Err(PriceError::TooManyFractionalDigits(raw.to_string()));
    }
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceError::NotANumber(raw.to_string()));
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceError::NotANumber(raw.to_string()));
    }

    let whole_value: i64 = whole.parse().map_err(|_| PriceError::NotANumber(raw.to_string()))?;
    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| PriceError::NotANumber(raw.to_string()))?
    };
    let pad = 10i64.pow((4 - frac.len()) as u32);

    let shifted = whole_value
        .checked_mul(10_000)
        .and_then(|v| v.checked_add(frac_value * pad))
        .ok_or_else(|| PriceError::Overflow(raw.to_string()))?;

    Price::try_from(shifted).map_err(|_| PriceError::Overflow(raw.to_string()))
}

/// Renders a shifted price back to a decimal string without trailing zeros
/// in the fractional part, and without a decimal point at all when the
/// price is a whole number.
pub fn format_price(shifted: Price) -> String {
    let whole = shifted / 10_000;
    let frac = shifted % 10_000;
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{frac:04}");
    let trimmed = frac_str.trim_end_matches('0');
    format!("{whole}.{trimmed}")
}
