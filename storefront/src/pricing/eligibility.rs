//! Discount code eligibility
//!
//! Decides whether a code can be used right now for a product or a cart.
//! Checks run in a fixed order and stop at the first failure, so the buyer
//! always sees the most fundamental reason.

use chrono::{DateTime, Utc};
use shared::error::ErrorCode;
use shared::models::DiscountCode;
use thiserror::Error;
use uuid::Uuid;

use crate::BoxError;
use crate::store::DiscountCodeStore;

/// Why a code cannot be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("Invalid discount code")]
    NotFound,
    #[error("Discount code is no longer active")]
    Inactive,
    #[error("Discount code has reached its usage limit")]
    UsageLimitReached,
    #[error("Coupon has expired")]
    Expired,
    #[error("Discount code does not apply to these products")]
    NotApplicable,
}

impl Ineligible {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound => ErrorCode::DiscountCodeNotFound,
            Self::Inactive => ErrorCode::DiscountCodeInactive,
            Self::UsageLimitReached => ErrorCode::DiscountCodeUsageLimitReached,
            Self::Expired => ErrorCode::DiscountCodeExpired,
            Self::NotApplicable => ErrorCode::DiscountCodeNotApplicable,
        }
    }
}

/// One product in an evaluation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub product_id: Uuid,
    pub category_ids: Vec<Uuid>,
}

/// What the code is being evaluated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibilityContext {
    /// Single-purchase flow: the code must target this product
    Product(ContextLine),
    /// Cart flow: usable if any line is targeted
    Cart(Vec<ContextLine>),
}

impl EligibilityContext {
    fn matches(&self, code: &DiscountCode) -> bool {
        match self {
            Self::Product(line) => code.applies_to(line.product_id, &line.category_ids),
            Self::Cart(lines) => lines
                .iter()
                .any(|line| code.applies_to(line.product_id, &line.category_ids)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Usable(DiscountCode),
    Rejected(Ineligible),
}

impl Eligibility {
    pub fn into_result(self) -> Result<DiscountCode, Ineligible> {
        match self {
            Self::Usable(code) => Ok(code),
            Self::Rejected(reason) => Err(reason),
        }
    }
}

/// Checks 2-5 on an already loaded record.
pub fn check_usable(
    code: &DiscountCode,
    now: DateTime<Utc>,
    context: &EligibilityContext,
) -> Result<(), Ineligible> {
    if !code.is_active {
        return Err(Ineligible::Inactive);
    }
    if code.is_exhausted() {
        return Err(Ineligible::UsageLimitReached);
    }
    if code.is_expired(now) {
        return Err(Ineligible::Expired);
    }
    if !context.matches(code) {
        return Err(Ineligible::NotApplicable);
    }
    Ok(())
}

/// Look the code up by exact match and run every check.
pub async fn evaluate<S>(
    store: &S,
    code: &str,
    now: DateTime<Utc>,
    context: &EligibilityContext,
) -> Result<Eligibility, BoxError>
where
    S: DiscountCodeStore + ?Sized,
{
    let Some(record) = store.find_discount_code(code).await? else {
        return Ok(Eligibility::Rejected(Ineligible::NotFound));
    };
    Ok(match check_usable(&record, now, context) {
        Ok(()) => Eligibility::Usable(record),
        Err(reason) => Eligibility::Rejected(reason),
    })
}
