//! Unified error codes for the storefront
//!
//! This module defines all error codes used by the storefront service and its clients.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Customer errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Product errors
//! - 7xxx: Discount code errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,

    // ==================== 3xxx: Customer ====================
    /// Customer not found
    CustomerNotFound = 3001,
    /// Email address is malformed
    InvalidEmail = 3002,
    /// Buyer already owns the product
    AlreadyPurchased = 3003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Order is empty
    OrderEmpty = 4007,
    /// Cart content is invalid
    InvalidCart = 4008,
    /// Line quantity outside the allowed range
    InvalidQuantity = 4009,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Payment could not be set up with the processor
    PaymentSetupFailed = 5002,
    /// Webhook signature is missing or invalid
    WebhookSignatureInvalid = 5003,
    /// Webhook payload is malformed or incomplete
    WebhookPayloadInvalid = 5004,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product has invalid price
    ProductInvalidPrice = 6002,
    /// Product is not available for purchase
    ProductUnavailable = 6003,
    /// Product is referenced by orders
    ProductHasOrders = 6004,

    // ==================== 7xxx: Discount code ====================
    /// Discount code not found
    DiscountCodeNotFound = 7001,
    /// Discount code is deactivated
    DiscountCodeInactive = 7002,
    /// Discount code usage limit reached
    DiscountCodeUsageLimitReached = 7003,
    /// Discount code has expired
    DiscountCodeExpired = 7004,
    /// Discount code does not apply to the cart or product
    DiscountCodeNotApplicable = 7005,
    /// Discount code already exists
    DiscountCodeExists = 7006,
    /// Discount code has been used and cannot be deleted
    DiscountCodeInUse = 7007,
    /// Discount code definition violates its invariants
    DiscountCodeInvalid = 7008,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Timeout error
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// External service (payment processor, email) failed
    ExternalServiceError = 9006,
    /// Stored discount type is not recognised
    InvalidDiscountType = 9007,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",

            // Customer
            ErrorCode::CustomerNotFound => "Customer not found",
            ErrorCode::InvalidEmail => "Invalid email address",
            ErrorCode::AlreadyPurchased => "You have already purchased this product",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order has already been paid",
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::InvalidCart => "Invalid cart",
            ErrorCode::InvalidQuantity => "Quantity must be between 1 and 99",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::PaymentSetupFailed => "Unknown error.",
            ErrorCode::WebhookSignatureInvalid => "Invalid webhook signature",
            ErrorCode::WebhookPayloadInvalid => "Invalid webhook payload",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product has invalid price",
            ErrorCode::ProductUnavailable => "Product is not available for purchase",
            ErrorCode::ProductHasOrders => "Product has associated orders",

            // Discount code
            ErrorCode::DiscountCodeNotFound => "Invalid discount code",
            ErrorCode::DiscountCodeInactive => "Discount code is no longer active",
            ErrorCode::DiscountCodeUsageLimitReached => {
                "Discount code has reached its usage limit"
            }
            ErrorCode::DiscountCodeExpired => "Coupon has expired",
            ErrorCode::DiscountCodeNotApplicable => {
                "Discount code does not apply to these products"
            }
            ErrorCode::DiscountCodeExists => "Discount code already exists",
            ErrorCode::DiscountCodeInUse => "Discount code has been used and cannot be deleted",
            ErrorCode::DiscountCodeInvalid => "Discount code definition is invalid",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ExternalServiceError => "Unknown error, please try again",
            ErrorCode::InvalidDiscountType => "Invalid discount type",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),

            // Customer
            3001 => Ok(ErrorCode::CustomerNotFound),
            3002 => Ok(ErrorCode::InvalidEmail),
            3003 => Ok(ErrorCode::AlreadyPurchased),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyPaid),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::InvalidCart),
            4009 => Ok(ErrorCode::InvalidQuantity),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentSetupFailed),
            5003 => Ok(ErrorCode::WebhookSignatureInvalid),
            5004 => Ok(ErrorCode::WebhookPayloadInvalid),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductInvalidPrice),
            6003 => Ok(ErrorCode::ProductUnavailable),
            6004 => Ok(ErrorCode::ProductHasOrders),

            // Discount code
            7001 => Ok(ErrorCode::DiscountCodeNotFound),
            7002 => Ok(ErrorCode::DiscountCodeInactive),
            7003 => Ok(ErrorCode::DiscountCodeUsageLimitReached),
            7004 => Ok(ErrorCode::DiscountCodeExpired),
            7005 => Ok(ErrorCode::DiscountCodeNotApplicable),
            7006 => Ok(ErrorCode::DiscountCodeExists),
            7007 => Ok(ErrorCode::DiscountCodeInUse),
            7008 => Ok(ErrorCode::DiscountCodeInvalid),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::ExternalServiceError),
            9007 => Ok(ErrorCode::InvalidDiscountType),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::AdminRequired.code(), 2003);
        assert_eq!(ErrorCode::AlreadyPurchased.code(), 3003);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::WebhookSignatureInvalid.code(), 5003);
        assert_eq!(ErrorCode::ProductHasOrders.code(), 6004);
        assert_eq!(ErrorCode::DiscountCodeInUse.code(), 7007);
        assert_eq!(ErrorCode::InvalidDiscountType.code(), 9007);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::DiscountCodeExpired.is_success());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(3003), Ok(ErrorCode::AlreadyPurchased));
        assert_eq!(ErrorCode::try_from(7004), Ok(ErrorCode::DiscountCodeExpired));
        assert_eq!(ErrorCode::try_from(9006), Ok(ErrorCode::ExternalServiceError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(8001), Err(InvalidErrorCode(8001)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::DiscountCodeExpired).unwrap();
        assert_eq!(json, "7004");

        let code: ErrorCode = serde_json::from_str("3003").unwrap();
        assert_eq!(code, ErrorCode::AlreadyPurchased);

        let result: Result<ErrorCode, _> = serde_json::from_str("8888");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "0");
        assert_eq!(format!("{}", ErrorCode::DiscountCodeNotFound), "7001");
    }

    #[test]
    fn test_customer_facing_messages() {
        assert_eq!(
            ErrorCode::AlreadyPurchased.message(),
            "You have already purchased this product"
        );
        assert_eq!(ErrorCode::DiscountCodeExpired.message(), "Coupon has expired");
        assert_eq!(ErrorCode::PaymentSetupFailed.message(), "Unknown error.");
    }

    #[test]
    fn test_invalid_error_code_display() {
        let err = InvalidErrorCode(999);
        assert_eq!(format!("{}", err), "invalid error code: 999");
    }
}
