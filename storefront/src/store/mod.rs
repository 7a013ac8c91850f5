//! Storage seams for the checkout and reconciliation flows
//!
//! Handlers that only read or administer data call `crate::db` directly with
//! the pool. The money paths go through these traits so they can run against
//! [`memory::MemoryStore`] in tests.

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;
use shared::models::{DiscountCode, NewOrder, Order, PaymentReceipt, Product, User};
use uuid::Uuid;

use crate::BoxError;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, BoxError>;

    /// Products for the given ids; missing ids are simply absent.
    async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, BoxError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteDiscountCode {
    /// Carries the mirrored Stripe coupon id, if any
    Deleted(Option<String>),
    /// Redeemed at least once
    InUse,
    /// Unpaid orders still point at the code and would lose their redemption
    Pending,
    NotFound,
}

#[async_trait]
pub trait DiscountCodeStore: Send + Sync {
    /// Exact, case-sensitive lookup
    async fn find_discount_code(&self, code: &str) -> Result<Option<DiscountCode>, BoxError>;

    /// Delete a code nothing has redeemed or is about to redeem
    async fn delete_discount_code(&self, id: Uuid) -> Result<DeleteDiscountCode, BoxError>;
}

/// Single-product order to open or reuse
#[derive(Debug, Clone)]
pub struct SinglePurchase {
    /// Id used if a new row is inserted
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub discount_code_id: Option<Uuid>,
    pub price_paid_in_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinglePurchaseSlot {
    /// Unpaid order ready for a payment intent (new or reused)
    Open(Uuid),
    /// The buyer already paid for this product
    AlreadyPaid,
}

/// Order that just became paid
#[derive(Debug, Clone)]
pub struct PaidOrder {
    pub order: Order,
    pub email: String,
}

/// What the processor actually charged for a single-product order.
///
/// The unpaid row is refreshed by every checkout attempt, so an older intent
/// can be the one that gets paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub amount_in_cents: i64,
    pub discount_code_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub enum MarkPaid {
    Transitioned(PaidOrder),
    AlreadyPaid,
    NotFound,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert or fetch the buyer by normalized email
    async fn upsert_user(&self, email: &str) -> Result<User, BoxError>;

    async fn has_paid_purchase(&self, email: &str, product_id: Uuid) -> Result<bool, BoxError>;

    /// Atomically open the buyer's single unpaid order for a product, or
    /// report that a paid one exists.
    async fn open_single_purchase(
        &self,
        purchase: &SinglePurchase,
    ) -> Result<SinglePurchaseSlot, BoxError>;

    /// Persist an unpaid cart order with its frozen lines
    async fn create_order(&self, order: &NewOrder) -> Result<(), BoxError>;

    async fn set_payment_reference(&self, order_id: Uuid, reference: &str)
    -> Result<(), BoxError>;

    /// UNPAID -> PAID, plus the discount code `uses` increment, in one
    /// transaction. Only the first call for an order transitions.
    async fn mark_paid(
        &self,
        order_id: Uuid,
        receipt: &PaymentReceipt,
        settlement: Option<&Settlement>,
    ) -> Result<MarkPaid, BoxError>;
}

#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, BoxError>;

    async fn record_event(&self, event_id: &str, event_type: &str) -> Result<(), BoxError>;
}

/// Everything the money paths need
pub trait Store: CatalogStore + DiscountCodeStore + OrderStore + WebhookEventStore {}

impl<T> Store for T where T: CatalogStore + DiscountCodeStore + OrderStore + WebhookEventStore {}
