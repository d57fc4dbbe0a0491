//! Human-readable amount parsing.
//!
//! The operator configures the claim amount in whole-token units (`"1000"`,
//! `"2.5"`). The service converts it once at startup into base units using
//! the token's on-chain decimal precision. Conversion is exact: an amount
//! that needs more fractional digits than the token has is rejected rather
//! than rounded.

use alloy_primitives::U256;
use rust_decimal::Decimal;

/// Errors from converting a human-readable amount to base units.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The input is not a decimal number.
    #[error("invalid amount {0:?}")]
    Invalid(String),
    /// Negative amounts cannot be disbursed.
    #[error("amount must not be negative")]
    Negative,
    /// The amount has more fractional digits than the token supports.
    #[error("amount has {scale} fractional digits but the token has only {decimals} decimals")]
    TooPrecise {
        /// Fractional digits in the configured amount.
        scale: u32,
        /// Token decimals.
        decimals: u8,
    },
    /// The base-unit value does not fit in a `uint256`.
    #[error("amount overflows uint256")]
    Overflow,
}

/// Converts a decimal string such as `"1000"` or `"0.25"` into token base units.
///
/// # Errors
///
/// Returns [`AmountError`] if the string is not a non-negative decimal, or if
/// it cannot be represented exactly with `decimals` fractional digits.
///
/// # Example
///
/// ```rust
/// use airdrop::amount::to_base_units;
/// use alloy_primitives::U256;
///
/// assert_eq!(to_base_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
/// ```
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = amount.trim();
    let value = Decimal::from_str_exact(trimmed)
        .map_err(|_| AmountError::Invalid(amount.to_owned()))?
        .normalize();
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative);
    }

    let scale = value.scale();
    if scale > u32::from(decimals) {
        return Err(AmountError::TooPrecise { scale, decimals });
    }

    let mantissa = value.mantissa().unsigned_abs();
    let exponent = U256::from(u32::from(decimals) - scale);
    U256::from(10u8)
        .checked_pow(exponent)
        .and_then(|multiplier| U256::from(mantissa).checked_mul(multiplier))
        .ok_or(AmountError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_amount_with_18_decimals() {
        let expected = U256::from(1000u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(to_base_units("1000", 18).unwrap(), expected);
    }

    #[test]
    fn test_fractional_amount() {
        assert_eq!(to_base_units("0.25", 2).unwrap(), U256::from(25u64));
        assert_eq!(to_base_units("1.50", 1).unwrap(), U256::from(15u64));
    }

    #[test]
    fn test_zero_decimals() {
        assert_eq!(to_base_units("1000", 0).unwrap(), U256::from(1000u64));
    }

    #[test]
    fn test_too_precise_is_rejected() {
        let err = to_base_units("0.001", 2).unwrap_err();
        assert_eq!(
            err,
            AmountError::TooPrecise {
                scale: 3,
                decimals: 2
            }
        );
    }

    #[test]
    fn test_invalid_and_negative() {
        assert!(matches!(
            to_base_units("abc", 18),
            Err(AmountError::Invalid(_))
        ));
        assert_eq!(to_base_units("-1", 18), Err(AmountError::Negative));
    }

    #[test]
    fn test_overflow() {
        assert_eq!(to_base_units("1000", 255), Err(AmountError::Overflow));
    }
}
