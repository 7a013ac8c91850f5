//! Discount Code Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Discount type enum
///
/// Stored as TEXT; decoding an unknown stored value is an integrity error,
/// see [`DiscountType::from_db`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `discount_amount` is percent points (1..=100)
    Percentage,
    /// `discount_amount` is whole currency units
    Fixed,
}

impl DiscountType {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PERCENTAGE" => Some(Self::Percentage),
            "FIXED" => Some(Self::Fixed),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Percentage => "PERCENTAGE",
            Self::Fixed => "FIXED",
        }
    }
}

/// Discount code entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountCode {
    pub id: Uuid,
    /// Exact-match code as entered by the admin (case-sensitive)
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_amount: i64,
    pub all_products: bool,
    pub product_ids: Vec<Uuid>,
    pub category_ids: Vec<Uuid>,
    /// Maximum number of paid orders that may reference this code
    pub limit: Option<i64>,
    pub uses: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Mirrored Stripe coupon, if any
    pub stripe_coupon_id: Option<String>,
}

impl DiscountCode {
    /// `uses` has reached `limit`
    pub fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.uses >= limit)
    }

    /// Expiration is strict: a code expiring exactly at `now` is expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Whether this code targets the given product, directly or through one
    /// of its categories.
    pub fn applies_to(&self, product_id: Uuid, category_ids: &[Uuid]) -> bool {
        self.all_products
            || self.product_ids.contains(&product_id)
            || category_ids.iter().any(|c| self.category_ids.contains(c))
    }
}

/// Admin list filter (`?status=active|expired`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountCodeStatus {
    /// Still usable: active, not exhausted, not expired
    Active,
    /// Unusable for any reason
    Expired,
}

/// Create / replace discount code payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_discount_rules"))]
pub struct DiscountCodeInput {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub discount_type: DiscountType,
    #[validate(range(min = 1))]
    pub discount_amount: i64,
    #[serde(default)]
    pub all_products: bool,
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    #[validate(range(min = 1))]
    pub limit: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Also create the coupon at the payment processor
    #[serde(default)]
    pub mirror_to_stripe: bool,
}

/// Cross-field rules the field validators cannot express.
fn validate_discount_rules(input: &DiscountCodeInput) -> Result<(), ValidationError> {
    if input.discount_type == DiscountType::Percentage && input.discount_amount > 100 {
        return Err(rule_error(
            "percentage_out_of_range",
            "Percentage discount must be between 1 and 100",
        ));
    }
    if input.all_products && (!input.product_ids.is_empty() || !input.category_ids.is_empty()) {
        return Err(rule_error(
            "all_products_with_targets",
            "A code for all products cannot list products or categories",
        ));
    }
    if !input.all_products && input.product_ids.is_empty() && input.category_ids.is_empty() {
        return Err(rule_error(
            "no_targets",
            "Select at least one product or category, or apply to all products",
        ));
    }
    if input.code.trim() != input.code || input.code.chars().any(char::is_whitespace) {
        return Err(rule_error("code_whitespace", "Code must not contain whitespace"));
    }
    Ok(())
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_input(discount_type: DiscountType, amount: i64) -> DiscountCodeInput {
        DiscountCodeInput {
            code: "SAVE20".to_string(),
            discount_type,
            discount_amount: amount,
            all_products: true,
            product_ids: vec![],
            category_ids: vec![],
            limit: None,
            expires_at: None,
            mirror_to_stripe: false,
        }
    }

    fn make_code() -> DiscountCode {
        DiscountCode {
            id: Uuid::new_v4(),
            code: "SAVE20".to_string(),
            discount_type: DiscountType::Percentage,
            discount_amount: 20,
            all_products: false,
            product_ids: vec![],
            category_ids: vec![],
            limit: None,
            uses: 0,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
            stripe_coupon_id: None,
        }
    }

    #[test]
    fn test_discount_type_db_round_trip() {
        assert_eq!(DiscountType::from_db("PERCENTAGE"), Some(DiscountType::Percentage));
        assert_eq!(DiscountType::from_db("FIXED"), Some(DiscountType::Fixed));
        assert_eq!(DiscountType::from_db("percentage"), None);
        assert_eq!(DiscountType::from_db("BOGO"), None);
        assert_eq!(DiscountType::Fixed.as_db(), "FIXED");
    }

    #[test]
    fn test_discount_type_serde() {
        let json = serde_json::to_string(&DiscountType::Percentage).unwrap();
        assert_eq!(json, "\"PERCENTAGE\"");
    }

    #[test]
    fn test_valid_input() {
        assert!(make_input(DiscountType::Percentage, 100).validate().is_ok());
        assert!(make_input(DiscountType::Fixed, 500).validate().is_ok());
    }

    #[test]
    fn test_percentage_over_100_rejected() {
        assert!(make_input(DiscountType::Percentage, 101).validate().is_err());
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert!(make_input(DiscountType::Fixed, 0).validate().is_err());
    }

    #[test]
    fn test_all_products_with_categories_rejected() {
        let mut input = make_input(DiscountType::Percentage, 10);
        input.category_ids = vec![Uuid::new_v4()];
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_no_targets_rejected() {
        let mut input = make_input(DiscountType::Percentage, 10);
        input.all_products = false;
        assert!(input.validate().is_err());

        input.product_ids = vec![Uuid::new_v4()];
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut input = make_input(DiscountType::Fixed, 5);
        input.limit = Some(0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_is_exhausted() {
        let mut code = make_code();
        assert!(!code.is_exhausted());
        code.limit = Some(3);
        code.uses = 2;
        assert!(!code.is_exhausted());
        code.uses = 3;
        assert!(code.is_exhausted());
    }

    #[test]
    fn test_is_expired_is_strict() {
        let now = Utc::now();
        let mut code = make_code();
        assert!(!code.is_expired(now));
        code.expires_at = Some(now);
        assert!(code.is_expired(now));
        code.expires_at = Some(now + chrono::Duration::seconds(1));
        assert!(!code.is_expired(now));
    }

    #[test]
    fn test_applies_to() {
        let product = Uuid::new_v4();
        let category = Uuid::new_v4();
        let mut code = make_code();
        assert!(!code.applies_to(product, &[category]));

        code.category_ids = vec![category];
        assert!(code.applies_to(product, &[category]));
        assert!(!code.applies_to(product, &[]));

        code.category_ids.clear();
        code.product_ids = vec![product];
        assert!(code.applies_to(product, &[]));

        code.product_ids.clear();
        code.all_products = true;
        assert!(code.applies_to(Uuid::new_v4(), &[]));
    }
}
