// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Implied-decimal fixed point used for quantities and prices on the ledger.

use alloy::primitives::U256;
use thiserror::Error;

/// Position sizes carry 8 implied decimals.
pub const QUANTITY_DECIMALS: u8 = 8;
/// Mark and entry prices carry 8 implied decimals.
pub const PRICE_DECIMALS: u8 = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScaleError {
    #[error("'{0}' is not a decimal number")]
    Invalid(String),
    #[error("'{input}' has more than {decimals} decimal places")]
    TooPrecise { input: String, decimals: u8 },
    #[error("'{0}' does not fit in 64 bits once scaled")]
    Overflow(String),
}

/// `"1.5"` at 8 decimals is `150_000_000`.
pub fn parse_fixed(input: &str, decimals: u8) -> Result<u64, ScaleError> {
    let trimmed = input.trim();
    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
        return Err(ScaleError::Invalid(input.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(ScaleError::TooPrecise {
            input: input.to_string(),
            decimals,
        });
    }

    let overflow = || ScaleError::Overflow(input.to_string());
    let scale = 10u64.checked_pow(decimals as u32).ok_or_else(overflow)?;
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| overflow())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(overflow)
}

/// Render a scaled integer with trailing zeros trimmed: `150_000_000` at 8 is `"1.5"`.
pub fn format_fixed(value: impl Into<U256>, decimals: u8) -> String {
    let digits = value.into().to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed() {
        assert_eq!(parse_fixed("1.5", 8), Ok(150_000_000));
        assert_eq!(parse_fixed("2", 8), Ok(200_000_000));
        assert_eq!(parse_fixed(".25", 2), Ok(25));
        assert_eq!(parse_fixed("0.00000001", 8), Ok(1));
        assert!(matches!(parse_fixed("0.000000001", 8), Err(ScaleError::TooPrecise { .. })));
        assert!(matches!(parse_fixed("-1", 8), Err(ScaleError::Invalid(_))));
        assert!(matches!(parse_fixed("1e5", 8), Err(ScaleError::Invalid(_))));
        assert!(matches!(parse_fixed(".", 8), Err(ScaleError::Invalid(_))));
        assert!(matches!(
            parse_fixed("184467440737.1", 8),
            Err(ScaleError::Overflow(_))
        ));
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(150_000_000u64, 8), "1.5");
        assert_eq!(format_fixed(100_000_000u64, 8), "1");
        assert_eq!(format_fixed(1u64, 8), "0.00000001");
        assert_eq!(format_fixed(0u64, 8), "0");
        assert_eq!(format_fixed(U256::from(4_213_750_000_000u64), PRICE_DECIMALS), "42137.5");
        assert_eq!(format_fixed(7u64, 0), "7");
    }
}
