//! Transactional email (AWS SES)

use async_trait::async_trait;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use shared::models::OrderHistoryEntry;
use uuid::Uuid;

use crate::BoxError;

/// What the buyer gets once an order is paid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub order_id: Uuid,
    pub amount_in_cents: i64,
    pub receipt_url: Option<String>,
    pub invoice_url: Option<String>,
    pub invoice_pdf_url: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_purchase_receipt(&self, to: &str, receipt: &PurchaseReceipt)
    -> Result<(), BoxError>;

    async fn send_order_history(&self, to: &str, orders: &[OrderHistoryEntry])
    -> Result<(), BoxError>;
}

#[derive(Clone)]
pub struct SesMailer {
    ses: SesClient,
    from: String,
}

impl SesMailer {
    pub fn new(ses: SesClient, from: impl Into<String>) -> Self {
        Self {
            ses,
            from: from.into(),
        }
    }

    async fn send_text(&self, to: &str, subject: &str, body_text: String) -> Result<(), BoxError> {
        let subject = Content::builder().data(subject).build()?;

        let body = Body::builder()
            .text(Content::builder().data(body_text).build()?)
            .build();

        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;
        Ok(())
    }
}

/// `1234` -> `12.34`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn purchase_receipt_body(receipt: &PurchaseReceipt) -> String {
    let mut body = format!(
        "Thank you for your purchase!\n\n\
         Order: {}\n\
         Amount paid: ${}\n",
        receipt.order_id,
        format_cents(receipt.amount_in_cents)
    );
    if let Some(url) = &receipt.receipt_url {
        body.push_str(&format!("Receipt: {url}\n"));
    }
    if let Some(url) = &receipt.invoice_url {
        body.push_str(&format!("Invoice: {url}\n"));
    }
    if let Some(url) = &receipt.invoice_pdf_url {
        body.push_str(&format!("Invoice PDF: {url}\n"));
    }
    body
}

fn order_history_body(orders: &[OrderHistoryEntry]) -> String {
    if orders.is_empty() {
        return "We could not find any paid orders for this email address.".to_string();
    }
    let mut body = String::from("Here are your orders:\n\n");
    for order in orders {
        body.push_str(&format!(
            "{}  ${}  (order {})\n",
            order.created_at.format("%Y-%m-%d"),
            format_cents(order.price_paid_in_cents),
            order.id
        ));
        if let Some(url) = order.invoice_url.as_ref().or(order.receipt_url.as_ref()) {
            body.push_str(&format!("    {url}\n"));
        }
    }
    body
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send_purchase_receipt(
        &self,
        to: &str,
        receipt: &PurchaseReceipt,
    ) -> Result<(), BoxError> {
        self.send_text(to, "Order Confirmation", purchase_receipt_body(receipt))
            .await?;
        tracing::info!(to = to, order_id = %receipt.order_id, "Purchase receipt sent");
        Ok(())
    }

    async fn send_order_history(
        &self,
        to: &str,
        orders: &[OrderHistoryEntry],
    ) -> Result<(), BoxError> {
        self.send_text(to, "Order History", order_history_body(orders))
            .await?;
        tracing::info!(to = to, count = orders.len(), "Order history sent");
        Ok(())
    }
}
