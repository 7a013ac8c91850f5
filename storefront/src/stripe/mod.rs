//! Stripe integration via REST API (no SDK dependency)
//!
//! [`PaymentGateway`] is the seam the checkout and reconciliation flows use;
//! [`StripeClient`] is the production implementation.

mod client;

pub use client::StripeClient;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared::models::DiscountCode;
use thiserror::Error;
use uuid::Uuid;

/// Metadata key set on payment intents owned by a hosted checkout session
pub const SESSION_INTENT_MARKER: &str = "checkout_session";

/// Signed events older than this are rejected (seconds)
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("stripe request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("stripe API error: {0}")]
    Api(String),
    #[error("stripe response missing {0}")]
    MissingField(&'static str),
}

/// Metadata attached to intents and sessions. `order_id` is the only thing
/// the webhook needs to find the order again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMetadata {
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub discount_code_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt_email: String,
    pub metadata: PaymentMetadata,
    /// Sent as the `Idempotency-Key` header
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub currency: String,
    pub lines: Vec<SessionLine>,
    pub metadata: PaymentMetadata,
    pub success_url: String,
    pub cancel_url: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceLinks {
    pub hosted_invoice_url: Option<String>,
    pub invoice_pdf: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<InvoiceLinks, GatewayError>;

    /// `receipt_url` of a charge, if Stripe has generated one
    async fn retrieve_charge_receipt(&self, charge_id: &str)
    -> Result<Option<String>, GatewayError>;

    /// Mirror a discount code as a Stripe coupon; returns the coupon id
    async fn create_coupon(&self, code: &DiscountCode) -> Result<String, GatewayError>;

    async fn delete_coupon(&self, coupon_id: &str) -> Result<(), GatewayError>;
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe sends several v1 entries while a secret is being rolled
    let matched = signatures.iter().any(|signature| {
        hex::decode(signature)
            .map(|sig_bytes| mac.clone().verify_slice(&sig_bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

/// Build a `Stripe-Signature` header value, as Stripe would
#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}
