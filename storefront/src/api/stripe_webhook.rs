//! Stripe webhook handler
//!
//! POST /stripe/webhook: Stripe events, raw body for signature verification

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::reconcile::WebhookOutcome;
use crate::state::AppState;
use crate::stripe;

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // 1. Get Stripe-Signature header
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    // 2. Verify signature
    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.stripe_webhook_secret)
    {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(event_type = event_type, "Received Stripe webhook");

    // 4. Reconcile
    match state.reconciler.handle_event(&event).await {
        Ok(WebhookOutcome::Finalized(order_id)) => {
            tracing::info!(%order_id, "Order finalized from webhook");
            StatusCode::OK
        }
        Ok(_) => StatusCode::OK,
        Err(e) if e.is_client_error() => {
            tracing::warn!(error = %e, event_type, "Rejected webhook event");
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            tracing::error!(error = %e, event_type, "Webhook processing failed, Stripe will retry");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
