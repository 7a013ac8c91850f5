//! In-memory store for tests. Mirrors the conditional-update semantics of the
//! SQL in `crate::db::orders`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{
    DiscountCode, NewOrder, Order, OrderLine, PaymentReceipt, Product, User,
};
use uuid::Uuid;

use super::{
    CatalogStore, DeleteDiscountCode, DiscountCodeStore, MarkPaid, OrderStore, PaidOrder,
    Settlement, SinglePurchase, SinglePurchaseSlot, WebhookEventStore,
};
use crate::BoxError;

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    codes: HashMap<Uuid, DiscountCode>,
    users: HashMap<Uuid, User>,
    orders: HashMap<Uuid, Order>,
    lines: Vec<OrderLine>,
    events: HashSet<String>,
    fail_writes: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: Product) {
        self.inner.lock().unwrap().products.insert(product.id, product);
    }

    pub fn insert_discount_code(&self, code: DiscountCode) {
        self.inner.lock().unwrap().codes.insert(code.id, code);
    }

    pub fn insert_order(&self, order: Order) {
        self.inner.lock().unwrap().orders.insert(order.id, order);
    }

    pub fn discount_code(&self, id: Uuid) -> Option<DiscountCode> {
        self.inner.lock().unwrap().codes.get(&id).cloned()
    }

    pub fn order(&self, id: Uuid) -> Option<Order> {
        self.inner.lock().unwrap().orders.get(&id).cloned()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.inner.lock().unwrap().orders.values().cloned().collect()
    }

    pub fn order_lines(&self, order_id: Uuid) -> Vec<OrderLine> {
        self.inner
            .lock()
            .unwrap()
            .lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    /// Make every write fail, as a lost database connection would
    pub fn fail_writes(&self) {
        self.inner.lock().unwrap().fail_writes = true;
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, BoxError> {
        Ok(self.inner.lock().unwrap().products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, BoxError> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl DiscountCodeStore for MemoryStore {
    async fn find_discount_code(&self, code: &str) -> Result<Option<DiscountCode>, BoxError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .codes
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn delete_discount_code(&self, id: Uuid) -> Result<DeleteDiscountCode, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(code) = inner.codes.get(&id) else {
            return Ok(DeleteDiscountCode::NotFound);
        };
        if code.uses > 0 {
            return Ok(DeleteDiscountCode::InUse);
        }
        if inner
            .orders
            .values()
            .any(|o| o.discount_code_id == Some(id) && !o.is_paid)
        {
            return Ok(DeleteDiscountCode::Pending);
        }
        let code = inner.codes.remove(&id);
        Ok(DeleteDiscountCode::Deleted(
            code.and_then(|c| c.stripe_coupon_id),
        ))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn upsert_user(&self, email: &str) -> Result<User, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err("database unavailable".into());
        }
        if let Some(user) = inner.users.values().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn has_paid_purchase(&self, email: &str, product_id: Uuid) -> Result<bool, BoxError> {
        let inner = self.inner.lock().unwrap();
        let Some(user) = inner.users.values().find(|u| u.email == email) else {
            return Ok(false);
        };
        Ok(inner.orders.values().any(|o| {
            o.user_id == user.id
                && o.is_paid
                && (o.product_id == Some(product_id)
                    || inner
                        .lines
                        .iter()
                        .any(|l| l.order_id == o.id && l.product_id == product_id))
        }))
    }

    async fn open_single_purchase(
        &self,
        purchase: &SinglePurchase,
    ) -> Result<SinglePurchaseSlot, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err("database unavailable".into());
        }
        let existing = inner
            .orders
            .values_mut()
            .find(|o| o.user_id == purchase.user_id && o.product_id == Some(purchase.product_id));

        let order_id = match existing {
            Some(order) if order.is_paid => return Ok(SinglePurchaseSlot::AlreadyPaid),
            Some(order) => {
                order.discount_code_id = purchase.discount_code_id;
                order.price_paid_in_cents = purchase.price_paid_in_cents;
                order.id
            }
            None => {
                let order = Order {
                    id: purchase.order_id,
                    user_id: purchase.user_id,
                    discount_code_id: purchase.discount_code_id,
                    product_id: Some(purchase.product_id),
                    price_paid_in_cents: purchase.price_paid_in_cents,
                    is_paid: false,
                    receipt_url: None,
                    invoice_url: None,
                    invoice_pdf_url: None,
                    payment_reference: None,
                    paid_at: None,
                    created_at: Utc::now(),
                };
                inner.orders.insert(order.id, order);
                purchase.order_id
            }
        };

        inner.lines.retain(|l| l.order_id != order_id);
        inner.lines.push(OrderLine {
            order_id,
            product_id: purchase.product_id,
            quantity: 1,
            price_paid_in_cents: purchase.price_paid_in_cents,
        });
        Ok(SinglePurchaseSlot::Open(order_id))
    }

    async fn create_order(&self, order: &NewOrder) -> Result<(), BoxError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err("database unavailable".into());
        }
        inner.orders.insert(
            order.id,
            Order {
                id: order.id,
                user_id: order.user_id,
                discount_code_id: order.discount_code_id,
                product_id: None,
                price_paid_in_cents: order.price_paid_in_cents,
                is_paid: false,
                receipt_url: None,
                invoice_url: None,
                invoice_pdf_url: None,
                payment_reference: None,
                paid_at: None,
                created_at: Utc::now(),
            },
        );
        for line in &order.lines {
            inner.lines.push(OrderLine {
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price_paid_in_cents: line.price_paid_in_cents,
            });
        }
        Ok(())
    }

    async fn set_payment_reference(
        &self,
        order_id: Uuid,
        reference: &str,
    ) -> Result<(), BoxError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.payment_reference = Some(reference.to_string());
        }
        Ok(())
    }

    async fn mark_paid(
        &self,
        order_id: Uuid,
        receipt: &PaymentReceipt,
        settlement: Option<&Settlement>,
    ) -> Result<MarkPaid, BoxError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err("database unavailable".into());
        }
        let settled_code = settlement
            .and_then(|s| s.discount_code_id)
            .filter(|id| inner.codes.contains_key(id));
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(MarkPaid::NotFound);
        };
        if order.is_paid {
            return Ok(MarkPaid::AlreadyPaid);
        }
        if let Some(settlement) = settlement {
            order.price_paid_in_cents = settlement.amount_in_cents;
            order.discount_code_id = settled_code;
        }
        order.is_paid = true;
        order.paid_at = Some(Utc::now());
        order.receipt_url = receipt.receipt_url.clone();
        order.invoice_url = receipt.invoice_url.clone();
        order.invoice_pdf_url = receipt.invoice_pdf_url.clone();
        let order = order.clone();

        if settlement.is_some() && order.product_id.is_some() {
            for line in inner.lines.iter_mut().filter(|l| l.order_id == order_id) {
                line.price_paid_in_cents = order.price_paid_in_cents;
            }
        }

        if let Some(code) = order
            .discount_code_id
            .and_then(|id| inner.codes.get_mut(&id))
        {
            code.uses += 1;
        }
        let email = inner
            .users
            .get(&order.user_id)
            .map(|u| u.email.clone())
            .unwrap_or_default();
        Ok(MarkPaid::Transitioned(PaidOrder { order, email }))
    }
}

#[async_trait]
impl WebhookEventStore for MemoryStore {
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, BoxError> {
        Ok(self.inner.lock().unwrap().events.contains(event_id))
    }

    async fn record_event(&self, event_id: &str, _event_type: &str) -> Result<(), BoxError> {
        self.inner
            .lock()
            .unwrap()
            .events
            .insert(event_id.to_string());
        Ok(())
    }
}
