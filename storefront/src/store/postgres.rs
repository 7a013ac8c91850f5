//! PostgreSQL-backed store over the `crate::db` free functions

use async_trait::async_trait;
use shared::models::{DiscountCode, NewOrder, PaymentReceipt, Product, User};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    CatalogStore, DeleteDiscountCode, DiscountCodeStore, MarkPaid, OrderStore, Settlement,
    SinglePurchase, SinglePurchaseSlot, WebhookEventStore,
};
use crate::BoxError;
use crate::db;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, BoxError> {
        Ok(db::products::find_by_id(&self.pool, id).await?)
    }

    async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, BoxError> {
        Ok(db::products::find_by_ids(&self.pool, ids).await?)
    }
}

#[async_trait]
impl DiscountCodeStore for PgStore {
    async fn find_discount_code(&self, code: &str) -> Result<Option<DiscountCode>, BoxError> {
        db::discount_codes::find_by_code(&self.pool, code).await
    }

    async fn delete_discount_code(&self, id: Uuid) -> Result<DeleteDiscountCode, BoxError> {
        Ok(db::discount_codes::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn upsert_user(&self, email: &str) -> Result<User, BoxError> {
        Ok(db::users::upsert(&self.pool, email).await?)
    }

    async fn has_paid_purchase(&self, email: &str, product_id: Uuid) -> Result<bool, BoxError> {
        Ok(db::orders::has_paid_purchase(&self.pool, email, product_id).await?)
    }

    async fn open_single_purchase(
        &self,
        purchase: &SinglePurchase,
    ) -> Result<SinglePurchaseSlot, BoxError> {
        Ok(db::orders::open_single_purchase(&self.pool, purchase).await?)
    }

    async fn create_order(&self, order: &NewOrder) -> Result<(), BoxError> {
        Ok(db::orders::create(&self.pool, order).await?)
    }

    async fn set_payment_reference(
        &self,
        order_id: Uuid,
        reference: &str,
    ) -> Result<(), BoxError> {
        Ok(db::orders::set_payment_reference(&self.pool, order_id, reference).await?)
    }

    async fn mark_paid(
        &self,
        order_id: Uuid,
        receipt: &PaymentReceipt,
        settlement: Option<&Settlement>,
    ) -> Result<MarkPaid, BoxError> {
        Ok(db::orders::mark_paid(&self.pool, order_id, receipt, settlement).await?)
    }
}

#[async_trait]
impl WebhookEventStore for PgStore {
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, BoxError> {
        Ok(db::webhook_events::is_processed(&self.pool, event_id).await?)
    }

    async fn record_event(&self, event_id: &str, event_type: &str) -> Result<(), BoxError> {
        Ok(db::webhook_events::record(&self.pool, event_id, event_type).await?)
    }
}
