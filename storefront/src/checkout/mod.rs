//! Order/payment orchestration
//!
//! Turns a buyer's intent to pay into an unpaid order plus a Stripe object
//! the browser can complete:
//!
//! - single product: a payment intent client secret
//! - cart: a hosted checkout session URL
//!
//! Nothing here marks an order paid or touches coupon usage; that happens
//! only in [`crate::reconcile`] once Stripe confirms the payment.

mod error;

pub use error::CheckoutError;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use shared::models::{
    Cart, CartLine, DiscountCode, DiscountType, NewOrder, NewOrderLine, normalize_email,
};
use uuid::Uuid;

use crate::pricing::{
    Allocation, CategoryIndex, ContextLine, EligibilityContext, allocate,
    compute_discounted_amount, evaluate,
};
use crate::store::{SinglePurchase, SinglePurchaseSlot, Store};
use crate::stripe::{
    CheckoutSessionRequest, PaymentGateway, PaymentIntentRequest, PaymentMetadata, SessionLine,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentIntentCreated {
    pub client_secret: String,
    pub order_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckoutSessionCreated {
    pub url: String,
    pub order_id: Uuid,
    pub amount: i64,
}

/// What the cart would cost with a coupon applied
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CouponPreview {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_amount: i64,
    pub allocation: Allocation,
    pub subtotal: i64,
    pub total: i64,
}

/// Cart re-read from the catalog
struct PricedCart {
    cart: Cart,
    categories: CategoryIndex,
}

impl PricedCart {
    fn context(&self) -> EligibilityContext {
        EligibilityContext::Cart(
            self.cart
                .lines
                .iter()
                .map(|line| ContextLine {
                    product_id: line.product_id,
                    category_ids: self
                        .categories
                        .get(&line.product_id)
                        .cloned()
                        .unwrap_or_default(),
                })
                .collect(),
        )
    }
}

/// Stripe keeps idempotency keys for 24h; the same order, amount and coupon
/// must map to the same key so a double submit reuses the intent.
pub fn idempotency_key(order_id: Uuid, amount: i64, discount_code_id: Option<Uuid>) -> String {
    let discount = discount_code_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    format!("pi-{order_id}-{amount}-{discount}")
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
    storefront_url: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
        storefront_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            currency: currency.into(),
            storefront_url: storefront_url.into(),
        }
    }

    /// Single-product purchase. Safe to call repeatedly: the buyer's unpaid
    /// order for the product is reused.
    pub async fn create_payment_intent(
        &self,
        buyer_email: &str,
        product_id: Uuid,
        coupon_code: Option<&str>,
    ) -> Result<PaymentIntentCreated, CheckoutError> {
        let email = normalize_email(buyer_email).ok_or(CheckoutError::InvalidEmail)?;

        let product = match self.store.find_product(product_id).await? {
            Some(p) if p.is_available_for_purchase => p,
            _ => {
                tracing::info!(%product_id, "Checkout for missing or unavailable product");
                return Err(CheckoutError::ProductUnavailable);
            }
        };

        let code = match coupon_code {
            Some(coupon) => {
                let context = EligibilityContext::Product(ContextLine {
                    product_id,
                    category_ids: product.category_ids.clone(),
                });
                match evaluate(self.store.as_ref(), coupon, Utc::now(), &context)
                    .await?
                    .into_result()
                {
                    Ok(code) => Some(code),
                    Err(reason) => {
                        tracing::info!(%product_id, coupon, %reason, "Coupon rejected at checkout");
                        return Err(CheckoutError::CouponRejected);
                    }
                }
            }
            None => None,
        };

        if self.store.has_paid_purchase(&email, product_id).await? {
            return Err(CheckoutError::AlreadyPurchased);
        }

        let amount = match &code {
            Some(c) => {
                compute_discounted_amount(product.price_in_cents, c.discount_type, c.discount_amount)?
            }
            None => product.price_in_cents,
        };
        let discount_code_id = code.as_ref().map(|c| c.id);

        let user = self.store.upsert_user(&email).await?;
        let slot = self
            .store
            .open_single_purchase(&SinglePurchase {
                order_id: Uuid::new_v4(),
                user_id: user.id,
                product_id,
                discount_code_id,
                price_paid_in_cents: amount,
            })
            .await?;
        let order_id = match slot {
            SinglePurchaseSlot::Open(id) => id,
            // Paid between the check above and the upsert
            SinglePurchaseSlot::AlreadyPaid => return Err(CheckoutError::AlreadyPurchased),
        };

        let request = PaymentIntentRequest {
            amount,
            currency: self.currency.clone(),
            receipt_email: email,
            metadata: PaymentMetadata {
                order_id,
                product_id: Some(product_id),
                discount_code_id,
            },
            idempotency_key: idempotency_key(order_id, amount, discount_code_id),
        };
        let intent = match self.gateway.create_payment_intent(&request).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!(%order_id, %product_id, error = %e, "Payment intent creation failed");
                return Err(CheckoutError::PaymentSetup);
            }
        };
        let Some(client_secret) = intent.client_secret else {
            tracing::error!(%order_id, intent_id = %intent.id, "Payment intent has no client secret");
            return Err(CheckoutError::PaymentSetup);
        };

        self.record_reference(order_id, &intent.id).await;

        tracing::info!(%order_id, %product_id, amount, "Payment intent created");
        Ok(PaymentIntentCreated {
            client_secret,
            order_id,
            amount,
        })
    }

    /// Multi-item purchase through a hosted checkout session
    pub async fn create_checkout_session(
        &self,
        buyer_email: &str,
        cart: &Cart,
        coupon_code: Option<&str>,
    ) -> Result<CheckoutSessionCreated, CheckoutError> {
        let email = normalize_email(buyer_email).ok_or(CheckoutError::InvalidEmail)?;
        let priced = self.reprice(cart).await?;

        let (allocation, code) = match coupon_code {
            Some(coupon) => {
                let code = self.usable_code(coupon, &priced).await?;
                (self.allocate(&priced, &code)?, Some(code))
            }
            None => (Allocation::none(&priced.cart), None),
        };
        let discount_code_id = code.as_ref().map(|c| c.id);
        let amount = allocation.total();

        let user = self.store.upsert_user(&email).await?;
        let order_id = Uuid::new_v4();
        self.store
            .create_order(&NewOrder {
                id: order_id,
                user_id: user.id,
                discount_code_id,
                price_paid_in_cents: amount,
                lines: allocation
                    .lines
                    .iter()
                    .map(|line| NewOrderLine {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        price_paid_in_cents: line.discounted_unit_price,
                    })
                    .collect(),
            })
            .await?;

        let names: HashMap<Uuid, &str> = priced
            .cart
            .lines
            .iter()
            .map(|l| (l.product_id, l.name.as_str()))
            .collect();
        let request = CheckoutSessionRequest {
            customer_email: email,
            currency: self.currency.clone(),
            lines: allocation
                .lines
                .iter()
                .map(|line| SessionLine {
                    name: names.get(&line.product_id).copied().unwrap_or_default().to_string(),
                    unit_amount: line.discounted_unit_price,
                    quantity: line.quantity,
                })
                .collect(),
            metadata: PaymentMetadata {
                order_id,
                product_id: None,
                discount_code_id,
            },
            success_url: format!("{}/purchase-success?order_id={order_id}", self.storefront_url),
            cancel_url: format!("{}/cart", self.storefront_url),
            idempotency_key: format!("cs-{order_id}"),
        };
        let session = match self.gateway.create_checkout_session(&request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(%order_id, error = %e, "Checkout session creation failed");
                return Err(CheckoutError::PaymentSetup);
            }
        };

        self.record_reference(order_id, &session.id).await;

        tracing::info!(%order_id, amount, lines = allocation.lines.len(), "Checkout session created");
        Ok(CheckoutSessionCreated {
            url: session.url,
            order_id,
            amount,
        })
    }

    /// Price the cart with a coupon without creating anything
    pub async fn preview_coupon(
        &self,
        coupon_code: &str,
        cart: &Cart,
    ) -> Result<CouponPreview, CheckoutError> {
        let priced = self.reprice(cart).await?;
        let code = self.usable_code(coupon_code, &priced).await?;
        let allocation = self.allocate(&priced, &code)?;

        Ok(CouponPreview {
            code: code.code,
            discount_type: code.discount_type,
            discount_amount: code.discount_amount,
            subtotal: allocation.subtotal(),
            total: allocation.total(),
            allocation,
        })
    }

    /// Replace snapshot prices and names with the catalog's
    async fn reprice(&self, cart: &Cart) -> Result<PricedCart, CheckoutError> {
        cart.check_shape().map_err(CheckoutError::InvalidCart)?;

        let ids: Vec<Uuid> = cart.lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<Uuid, _> = self
            .store
            .find_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut categories = CategoryIndex::new();
        let mut lines = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = match products.get(&line.product_id) {
                Some(p) if p.is_available_for_purchase => p,
                _ => {
                    tracing::info!(product_id = %line.product_id, "Cart line no longer purchasable");
                    return Err(CheckoutError::ProductUnavailable);
                }
            };
            if product.price_in_cents != line.unit_price {
                tracing::debug!(
                    product_id = %product.id,
                    snapshot = line.unit_price,
                    catalog = product.price_in_cents,
                    "Cart price snapshot is stale"
                );
            }
            categories.insert(product.id, product.category_ids.clone());
            lines.push(CartLine {
                product_id: product.id,
                unit_price: product.price_in_cents,
                quantity: line.quantity,
                name: product.name.clone(),
                thumbnail: line.thumbnail.clone(),
            });
        }

        Ok(PricedCart {
            cart: Cart::new(lines),
            categories,
        })
    }

    async fn usable_code(
        &self,
        coupon_code: &str,
        priced: &PricedCart,
    ) -> Result<DiscountCode, CheckoutError> {
        evaluate(self.store.as_ref(), coupon_code, Utc::now(), &priced.context())
            .await?
            .into_result()
            .map_err(|reason| {
                tracing::info!(coupon = coupon_code, %reason, "Coupon rejected for cart");
                CheckoutError::Coupon(reason)
            })
    }

    fn allocate(&self, priced: &PricedCart, code: &DiscountCode) -> Result<Allocation, CheckoutError> {
        let allocation = allocate(&priced.cart, code, &priced.categories)?;
        if !code.all_products && allocation.discounted_product_id.is_none() {
            return Err(CheckoutError::Coupon(crate::pricing::Ineligible::NotApplicable));
        }
        Ok(allocation)
    }

    /// The order id in metadata is what reconciliation relies on; the stored
    /// reference is informational, so a failure here is only logged.
    async fn record_reference(&self, order_id: Uuid, reference: &str) {
        if let Err(e) = self.store.set_payment_reference(order_id, reference).await {
            tracing::warn!(%order_id, reference, error = %e, "Failed to store payment reference");
        }
    }
}
