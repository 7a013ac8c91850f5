use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::BoxError;
use crate::pricing::{Ineligible, PricingError};

/// Checkout failures. The display strings are what the buyer sees.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Unexpected error")]
    ProductUnavailable,
    /// Any coupon failure on the single-product path
    #[error("Coupon has expired")]
    CouponRejected,
    #[error("You have already purchased this product")]
    AlreadyPurchased,
    #[error("Unknown error.")]
    PaymentSetup,
    #[error("Invalid cart")]
    InvalidCart(&'static str),
    /// Coupon rejection on the cart and preview paths, with its own reason
    #[error("{0}")]
    Coupon(Ineligible),
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),
    #[error("storage error: {0}")]
    Store(#[from] BoxError),
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        let message = e.to_string();
        match e {
            CheckoutError::ProductUnavailable => {
                AppError::with_message(ErrorCode::ProductUnavailable, message)
            }
            CheckoutError::CouponRejected => {
                AppError::with_message(ErrorCode::DiscountCodeInvalid, message)
            }
            CheckoutError::AlreadyPurchased => {
                AppError::with_message(ErrorCode::AlreadyPurchased, message)
            }
            CheckoutError::PaymentSetup => {
                AppError::with_message(ErrorCode::PaymentSetupFailed, message)
            }
            CheckoutError::InvalidCart(reason) => {
                AppError::with_message(ErrorCode::InvalidCart, message).with_detail("reason", reason)
            }
            CheckoutError::Coupon(reason) => AppError::with_message(reason.error_code(), message),
            CheckoutError::InvalidEmail => AppError::new(ErrorCode::InvalidEmail),
            CheckoutError::Pricing(err) => {
                tracing::error!(error = %err, "Pricing integrity error during checkout");
                AppError::new(ErrorCode::InternalError)
            }
            CheckoutError::Store(err) => {
                tracing::error!(error = %err, "Storage error during checkout");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}
