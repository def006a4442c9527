//! Token Amount and Address Formatting
//!
//! Exact conversion between human-readable decimal amounts and raw base
//! units, plus display helpers for addresses. Conversions use integer
//! arithmetic only: display strings feed back into write calls, so they
//! must round-trip without precision drift even for full-supply values.

use alloy::primitives::{Address, U256};
use thiserror::Error;

/// Errors produced by amount and address helpers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    /// The amount string is not a non-negative decimal number, or carries
    /// more fractional digits than the token's decimals allow
    #[error("invalid amount \"{amount}\": {reason}")]
    InvalidAmount { amount: String, reason: String },

    /// The address is not a 0x-prefixed 42-character string
    #[error("invalid address \"{0}\"")]
    InvalidAddress(String),
}

impl UnitError {
    fn invalid_amount(amount: &str, reason: &str) -> Self {
        UnitError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convert a human-readable decimal amount to raw base units
///
/// Accepts a plain decimal string like `"100"` or `"1.5"`. Either side of
/// the decimal point may be empty (`".5"`, `"5."`) but not both. Fails when
/// the string contains anything but digits and a single point, or when the
/// fraction has more digits than `decimals` permits.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, UnitError> {
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(UnitError::invalid_amount(amount, "no digits"));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(UnitError::invalid_amount(
            amount,
            "expected a non-negative decimal number",
        ));
    }
    if frac_part.len() > decimals as usize {
        return Err(UnitError::invalid_amount(
            amount,
            "too many fractional digits for token decimals",
        ));
    }

    let mut value = U256::ZERO;
    let ten = U256::from(10u64);
    for b in int_part.bytes().chain(frac_part.bytes()) {
        value = value
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from((b - b'0') as u64)))
            .ok_or_else(|| UnitError::invalid_amount(amount, "amount exceeds 256 bits"))?;
    }

    // Scale up for the fractional digits the string did not spell out
    let missing = decimals as usize - frac_part.len();
    for _ in 0..missing {
        value = value
            .checked_mul(ten)
            .ok_or_else(|| UnitError::invalid_amount(amount, "amount exceeds 256 bits"))?;
    }

    Ok(value)
}

/// Convert raw base units to a human-readable decimal string
///
/// Integer division/remainder formatting. Trailing fractional zeros are
/// trimmed and a zero fraction renders with no decimal point, so
/// `1500000000000000000` at 18 decimals renders as `"1.5"`.
pub fn to_display_units(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    let (int_part, frac_raw) = match U256::from(10u64).checked_pow(U256::from(decimals)) {
        Some(scale) => {
            let (q, r) = raw.div_rem(scale);
            (q.to_string(), r)
        }
        // 10^decimals does not fit in 256 bits, so the whole value is fractional
        None => ("0".to_string(), raw),
    };

    let frac = format!("{:0>width$}", frac_raw.to_string(), width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int_part
    } else {
        format!("{}.{}", int_part, frac)
    }
}

/// Shorten an address for display: first 6 + "..." + last 4 characters
///
/// Fails unless the input is exactly 42 characters starting with "0x".
pub fn shorten_address(address: &str) -> Result<String, UnitError> {
    if address.len() != 42 || !address.starts_with("0x") || !address.is_ascii() {
        return Err(UnitError::InvalidAddress(address.to_string()));
    }
    Ok(format!("{}...{}", &address[..6], &address[38..]))
}

/// Parse a 0x-prefixed address string, mapping failures to [`UnitError`]
///
/// Used by action validators so malformed addresses are caught before any
/// network call.
pub fn parse_address(address: &str) -> Result<Address, UnitError> {
    address
        .parse::<Address>()
        .map_err(|_| UnitError::InvalidAddress(address.to_string()))
}

/// Shortened checksummed form of a parsed address for user-facing text
pub fn short_display(address: Address) -> String {
    let full = address.to_string();
    shorten_address(&full).unwrap_or(full)
}
