//! Checkout endpoints
//!
//! Error bodies carry the buyer-facing message verbatim.

use axum::{Json, extract::State};
use serde::Deserialize;
use shared::models::Cart;
use uuid::Uuid;

use super::{ApiResult, coupon_code};
use crate::checkout::{CheckoutSessionCreated, PaymentIntentCreated};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub email: String,
    pub product_id: Uuid,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// POST /api/checkout/payment-intent
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(req): Json<PaymentIntentRequest>,
) -> ApiResult<PaymentIntentCreated> {
    let created = state
        .checkout
        .create_payment_intent(&req.email, req.product_id, coupon_code(&req.coupon_code))
        .await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionRequest {
    pub email: String,
    pub cart: Cart,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// POST /api/checkout/session
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(req): Json<CheckoutSessionRequest>,
) -> ApiResult<CheckoutSessionCreated> {
    let created = state
        .checkout
        .create_checkout_session(&req.email, &req.cart, coupon_code(&req.coupon_code))
        .await?;
    Ok(Json(created))
}
