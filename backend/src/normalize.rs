//! Decimal scaling between raw on-chain integers and human-scale amounts.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Convert a raw token amount to a human-scale quantity.
///
/// Uses exact decimal scaling when the scale fits `rust_decimal`
/// (28 places); larger scales fall back to float division.
pub fn normalize(raw: u64, decimals: u8) -> f64 {
    if let Ok(scaled) = Decimal::try_from_i128_with_scale(i128::from(raw), u32::from(decimals)) {
        if let Some(value) = scaled.to_f64() {
            return value;
        }
    }

    raw as f64 / 10f64.powi(i32::from(decimals))
}

/// Raw amount representing exactly one whole token.
///
/// Saturates at `u64::MAX` for precisions a u64 cannot hold.
pub fn one_unit(decimals: u8) -> u64 {
    10u64.checked_pow(u32::from(decimals)).unwrap_or(u64::MAX)
}
