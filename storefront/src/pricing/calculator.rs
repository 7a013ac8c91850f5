//! Discount Calculator
//!
//! Pure money math for discount codes. Amounts are integer minor units;
//! intermediate arithmetic runs in `rust_decimal` so no float ever touches a
//! price.

use rust_decimal::prelude::*;
use shared::models::DiscountType;
use thiserror::Error;

/// Minor units per whole currency unit (FIXED amounts are whole units)
pub const MINOR_UNITS: i64 = 100;

/// Smallest chargeable amount: a discount never makes something free
pub const MIN_CHARGE: i64 = 1;

/// Pricing integrity errors. These are defects, not user mistakes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("invalid discount type: {0}")]
    InvalidDiscountType(String),
    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("amount out of range")]
    Overflow,
}

/// Decode a stored discount type, failing closed on anything unknown.
pub fn parse_discount_type(value: &str) -> Result<DiscountType, PricingError> {
    DiscountType::from_db(value).ok_or_else(|| PricingError::InvalidDiscountType(value.to_string()))
}

/// Price after discount, in minor units.
///
/// - PERCENTAGE: `ceil(base - base * amount / 100)`
/// - FIXED: `ceil(base - amount * 100)`
///
/// The result is clamped to at least [`MIN_CHARGE`].
pub fn compute_discounted_amount(
    base: i64,
    discount_type: DiscountType,
    discount_amount: i64,
) -> Result<i64, PricingError> {
    if base <= 0 {
        return Err(PricingError::InvalidAmount(base));
    }
    let base_dec = Decimal::from(base);
    let amount = Decimal::from(discount_amount);

    let discounted = match discount_type {
        DiscountType::Percentage => base_dec - base_dec * amount / Decimal::ONE_HUNDRED,
        DiscountType::Fixed => base_dec - amount * Decimal::from(MINOR_UNITS),
    };

    let result = discounted.ceil().to_i64().ok_or(PricingError::Overflow)?;
    Ok(result.max(MIN_CHARGE))
}

/// Amount taken off `base` by the discount (`base - discounted`).
pub fn compute_discount(
    base: i64,
    discount_type: DiscountType,
    discount_amount: i64,
) -> Result<i64, PricingError> {
    Ok(base - compute_discounted_amount(base, discount_type, discount_amount)?)
}

/// `round(value * ratio)`, half away from zero
pub(crate) fn scale(value: i64, ratio: Decimal) -> Result<i64, PricingError> {
    (Decimal::from(value) * ratio)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::Overflow)
}
