//! Webhook-driven order finalization
//!
//! Orders move UNPAID -> PAID exactly once, and only here. The signature has
//! already been checked by the HTTP handler; this module only sees verified
//! events.

use std::sync::Arc;

use serde_json::Value;
use shared::models::PaymentReceipt;
use thiserror::Error;
use uuid::Uuid;

use crate::BoxError;
use crate::email::{Mailer, PurchaseReceipt};
use crate::store::{MarkPaid, PaidOrder, Settlement, Store};
use crate::stripe::{PaymentGateway, SESSION_INTENT_MARKER};

const SESSION_COMPLETED: &str = "checkout.session.completed";
const SESSION_ASYNC_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
const INTENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The order just became paid
    Finalized(Uuid),
    AlreadyPaid(Uuid),
    /// No such order; retrying will not help
    UnknownOrder(Uuid),
    /// Acknowledged without any state change
    Ignored,
    /// Event id seen before
    Duplicate,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("malformed event: {0}")]
    Malformed(&'static str),
    #[error("event metadata has no order_id")]
    MissingOrderId,
    #[error("event metadata order_id is not a UUID: {0}")]
    InvalidOrderId(String),
    #[error("storage error: {0}")]
    Store(#[from] BoxError),
}

impl ReconcileError {
    /// Bad input is not worth a retry; storage failures are
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Arc<dyn Mailer>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            gateway,
            mailer,
        }
    }

    pub async fn handle_event(&self, event: &Value) -> Result<WebhookOutcome, ReconcileError> {
        let event_id = event["id"]
            .as_str()
            .ok_or(ReconcileError::Malformed("missing event id"))?;
        let event_type = event["type"]
            .as_str()
            .ok_or(ReconcileError::Malformed("missing event type"))?;

        if self.store.is_event_processed(event_id).await? {
            tracing::info!(event_id, "Duplicate webhook event, skipping");
            return Ok(WebhookOutcome::Duplicate);
        }

        let object = &event["data"]["object"];
        let outcome = match event_type {
            SESSION_COMPLETED | SESSION_ASYNC_SUCCEEDED => {
                self.on_session_paid(event_type, object).await?
            }
            INTENT_SUCCEEDED => self.on_intent_succeeded(object).await?,
            _ => {
                tracing::info!(event_id, event_type, "Webhook event acknowledged");
                WebhookOutcome::Ignored
            }
        };

        // A lost record only means a redelivery is reconciled again, which
        // mark_paid already tolerates
        if let Err(e) = self.store.record_event(event_id, event_type).await {
            tracing::warn!(event_id, error = %e, "Failed to record processed webhook event");
        }
        Ok(outcome)
    }

    async fn on_session_paid(
        &self,
        event_type: &str,
        session: &Value,
    ) -> Result<WebhookOutcome, ReconcileError> {
        let order_id = order_id_of(session)?;

        // Delayed payment methods complete the session before the money
        // arrives; async_payment_succeeded follows once it does
        let payment_status = session["payment_status"].as_str().unwrap_or("paid");
        if event_type == SESSION_COMPLETED
            && !matches!(payment_status, "paid" | "no_payment_required")
        {
            tracing::info!(%order_id, payment_status, "Checkout session completed before payment");
            return Ok(WebhookOutcome::Ignored);
        }

        let mut receipt = PaymentReceipt::default();
        if let Some(invoice_id) = session["invoice"].as_str() {
            match self.gateway.retrieve_invoice(invoice_id).await {
                Ok(links) => {
                    receipt.invoice_url = links.hosted_invoice_url;
                    receipt.invoice_pdf_url = links.invoice_pdf;
                }
                Err(e) => {
                    tracing::warn!(%order_id, invoice_id, error = %e, "Failed to fetch invoice");
                }
            }
        }

        self.finalize(order_id, receipt, None).await
    }

    async fn on_intent_succeeded(&self, intent: &Value) -> Result<WebhookOutcome, ReconcileError> {
        let order_id = order_id_of(intent)?;

        if intent["metadata"][SESSION_INTENT_MARKER].as_str() == Some("true") {
            tracing::debug!(%order_id, "Intent belongs to a checkout session, left to the session event");
            return Ok(WebhookOutcome::Ignored);
        }

        let settlement = settlement_of(intent)?;

        let mut receipt = PaymentReceipt::default();
        if let Some(charge_id) = intent["latest_charge"].as_str() {
            match self.gateway.retrieve_charge_receipt(charge_id).await {
                Ok(url) => receipt.receipt_url = url,
                Err(e) => {
                    tracing::warn!(%order_id, charge_id, error = %e, "Failed to fetch charge receipt");
                }
            }
        }

        self.finalize(order_id, receipt, settlement.as_ref()).await
    }

    async fn finalize(
        &self,
        order_id: Uuid,
        receipt: PaymentReceipt,
        settlement: Option<&Settlement>,
    ) -> Result<WebhookOutcome, ReconcileError> {
        match self.store.mark_paid(order_id, &receipt, settlement).await? {
            MarkPaid::Transitioned(paid) => {
                tracing::info!(
                    %order_id,
                    amount = paid.order.price_paid_in_cents,
                    discount_code_id = ?paid.order.discount_code_id,
                    "Order paid"
                );
                self.send_receipt(&paid).await;
                Ok(WebhookOutcome::Finalized(order_id))
            }
            MarkPaid::AlreadyPaid => {
                tracing::info!(%order_id, "Order already paid, nothing to do");
                Ok(WebhookOutcome::AlreadyPaid(order_id))
            }
            MarkPaid::NotFound => {
                tracing::warn!(%order_id, "Payment event for unknown order");
                Ok(WebhookOutcome::UnknownOrder(order_id))
            }
        }
    }

    async fn send_receipt(&self, paid: &PaidOrder) {
        if paid.email.is_empty() {
            return;
        }
        let receipt = PurchaseReceipt {
            order_id: paid.order.id,
            amount_in_cents: paid.order.price_paid_in_cents,
            receipt_url: paid.order.receipt_url.clone(),
            invoice_url: paid.order.invoice_url.clone(),
            invoice_pdf_url: paid.order.invoice_pdf_url.clone(),
        };
        if let Err(e) = self.mailer.send_purchase_receipt(&paid.email, &receipt).await {
            tracing::warn!(order_id = %paid.order.id, error = %e, "Failed to send purchase receipt");
        }
    }
}

fn order_id_of(object: &Value) -> Result<Uuid, ReconcileError> {
    let raw = object["metadata"]["order_id"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or(ReconcileError::MissingOrderId)?;
    Uuid::parse_str(raw).map_err(|_| ReconcileError::InvalidOrderId(raw.to_string()))
}

/// Amount and code an intent was created with. A later checkout attempt
/// may have repriced the order row, so the intent is the record of truth.
fn settlement_of(intent: &Value) -> Result<Option<Settlement>, ReconcileError> {
    let Some(amount_in_cents) = intent["amount_received"]
        .as_i64()
        .or_else(|| intent["amount"].as_i64())
    else {
        return Ok(None);
    };
    let discount_code_id = match intent["metadata"]["discount_code_id"].as_str() {
        None | Some("") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| ReconcileError::Malformed("discount_code_id is not a UUID"))?,
        ),
    };
    Ok(Some(Settlement {
        amount_in_cents,
        discount_code_id,
    }))
}
