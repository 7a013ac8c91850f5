use async_trait::async_trait;
use shared::models::{DiscountCode, DiscountType};

use super::{
    CheckoutSession, CheckoutSessionRequest, GatewayError, InvoiceLinks, PaymentGateway,
    PaymentIntent, PaymentIntentRequest, PaymentMetadata, SESSION_INTENT_MARKER,
};

const API_BASE: &str = "https://api.stripe.com/v1";

/// Form-encoded Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
        }
    }

    async fn post(
        &self,
        path: &str,
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<serde_json::Value, GatewayError> {
        let mut request = self
            .http
            .post(format!("{API_BASE}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        into_json(request.send().await?).await
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .http
            .get(format!("{API_BASE}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        into_json(response).await
    }

    async fn delete(&self, path: &str) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .http
            .delete(format!("{API_BASE}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        into_json(response).await
    }
}

async fn into_json(response: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
    let status = response.status();
    let body: serde_json::Value = response.json().await?;
    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(GatewayError::Api(message));
    }
    Ok(body)
}

fn metadata_fields(metadata: &PaymentMetadata, prefix: &str) -> Vec<(String, String)> {
    let mut fields = vec![(
        format!("{prefix}[order_id]"),
        metadata.order_id.to_string(),
    )];
    if let Some(product_id) = metadata.product_id {
        fields.push((format!("{prefix}[product_id]"), product_id.to_string()));
    }
    fields.push((
        format!("{prefix}[discount_code_id]"),
        metadata
            .discount_code_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
    ));
    fields
}

fn payment_intent_form(request: &PaymentIntentRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount.to_string()),
        ("currency".to_string(), request.currency.clone()),
        ("receipt_email".to_string(), request.receipt_email.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    form.extend(metadata_fields(&request.metadata, "metadata"));
    form
}

fn checkout_session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), request.customer_email.clone()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("invoice_creation[enabled]".to_string(), "true".to_string()),
    ];
    for (i, line) in request.lines.iter().enumerate() {
        let p = format!("line_items[{i}]");
        form.push((format!("{p}[quantity]"), line.quantity.to_string()));
        form.push((format!("{p}[price_data][currency]"), request.currency.clone()));
        form.push((format!("{p}[price_data][unit_amount]"), line.unit_amount.to_string()));
        form.push((format!("{p}[price_data][product_data][name]"), line.name.clone()));
    }
    form.extend(metadata_fields(&request.metadata, "metadata"));
    // The session's own intent also emits payment_intent.succeeded; mark it
    // so reconciliation leaves finalization to the session event.
    form.push((
        format!("payment_intent_data[metadata][{SESSION_INTENT_MARKER}]"),
        "true".to_string(),
    ));
    form.push((
        "payment_intent_data[metadata][order_id]".to_string(),
        request.metadata.order_id.to_string(),
    ));
    form
}

fn coupon_form(code: &DiscountCode) -> Vec<(String, String)> {
    let mut form = vec![
        ("name".to_string(), code.code.clone()),
        ("duration".to_string(), "once".to_string()),
        ("metadata[discount_code_id]".to_string(), code.id.to_string()),
    ];
    match code.discount_type {
        DiscountType::Percentage => {
            form.push(("percent_off".to_string(), code.discount_amount.to_string()));
        }
        DiscountType::Fixed => {
            form.push((
                "amount_off".to_string(),
                (code.discount_amount * 100).to_string(),
            ));
            form.push(("currency".to_string(), "usd".to_string()));
        }
    }
    if let Some(limit) = code.limit {
        form.push(("max_redemptions".to_string(), limit.to_string()));
    }
    if let Some(expires_at) = code.expires_at {
        form.push(("redeem_by".to_string(), expires_at.timestamp().to_string()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .post(
                "/payment_intents",
                &payment_intent_form(request),
                Some(&request.idempotency_key),
            )
            .await?;

        let id = resp["id"]
            .as_str()
            .map(String::from)
            .ok_or(GatewayError::MissingField("id"))?;
        Ok(PaymentIntent {
            id,
            client_secret: resp["client_secret"].as_str().map(String::from),
        })
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let resp = self
            .post(
                "/checkout/sessions",
                &checkout_session_form(request),
                Some(&request.idempotency_key),
            )
            .await?;

        let id = resp["id"]
            .as_str()
            .map(String::from)
            .ok_or(GatewayError::MissingField("id"))?;
        let url = resp["url"]
            .as_str()
            .map(String::from)
            .ok_or(GatewayError::MissingField("url"))?;
        Ok(CheckoutSession { id, url })
    }

    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<InvoiceLinks, GatewayError> {
        let resp = self.get(&format!("/invoices/{invoice_id}")).await?;
        Ok(InvoiceLinks {
            hosted_invoice_url: resp["hosted_invoice_url"].as_str().map(String::from),
            invoice_pdf: resp["invoice_pdf"].as_str().map(String::from),
        })
    }

    async fn retrieve_charge_receipt(
        &self,
        charge_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        let resp = self.get(&format!("/charges/{charge_id}")).await?;
        Ok(resp["receipt_url"].as_str().map(String::from))
    }

    async fn create_coupon(&self, code: &DiscountCode) -> Result<String, GatewayError> {
        let resp = self.post("/coupons", &coupon_form(code), None).await?;
        resp["id"]
            .as_str()
            .map(String::from)
            .ok_or(GatewayError::MissingField("id"))
    }

    async fn delete_coupon(&self, coupon_id: &str) -> Result<(), GatewayError> {
        self.delete(&format!("/coupons/{coupon_id}")).await?;
        Ok(())
    }
}
