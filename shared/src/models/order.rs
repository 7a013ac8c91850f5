//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order header
///
/// `product_id` is only set for single-product purchases and is unique per
/// buyer. An order becomes paid exactly once, via a verified payment event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub discount_code_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    /// Order total in minor units
    pub price_paid_in_cents: i64,
    pub is_paid: bool,
    pub receipt_url: Option<String>,
    pub invoice_url: Option<String>,
    pub invoice_pdf_url: Option<String>,
    /// Payment intent id or checkout session id
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Order line, prices frozen at creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Discounted unit price in minor units
    pub price_paid_in_cents: i64,
}

/// New order to persist (cart path)
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub discount_code_id: Option<Uuid>,
    pub price_paid_in_cents: i64,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_paid_in_cents: i64,
}

/// Receipt links captured when the order is finalized
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub receipt_url: Option<String>,
    pub invoice_url: Option<String>,
    pub invoice_pdf_url: Option<String>,
}

/// Admin order listing row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderListItem {
    pub id: Uuid,
    pub email: String,
    pub price_paid_in_cents: i64,
    pub is_paid: bool,
    pub discount_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Paid order summary for the order history email
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderHistoryEntry {
    pub id: Uuid,
    pub price_paid_in_cents: i64,
    pub created_at: DateTime<Utc>,
    pub receipt_url: Option<String>,
    pub invoice_url: Option<String>,
}
