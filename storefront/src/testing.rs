//! Test doubles for the payment gateway and mailer, plus record builders

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{DiscountCode, DiscountType, OrderHistoryEntry, Product};
use uuid::Uuid;

use crate::BoxError;
use crate::email::{Mailer, PurchaseReceipt};
use crate::stripe::{
    CheckoutSession, CheckoutSessionRequest, GatewayError, InvoiceLinks, PaymentGateway,
    PaymentIntent, PaymentIntentRequest,
};

pub fn product(name: &str, price_in_cents: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        price_in_cents,
        image_path: String::new(),
        is_available_for_purchase: true,
        category_ids: vec![],
        created_at: now,
        updated_at: now,
    }
}

pub fn discount_code(code: &str, discount_type: DiscountType, amount: i64) -> DiscountCode {
    DiscountCode {
        id: Uuid::new_v4(),
        code: code.to_string(),
        discount_type,
        discount_amount: amount,
        all_products: true,
        product_ids: vec![],
        category_ids: vec![],
        limit: None,
        uses: 0,
        expires_at: None,
        is_active: true,
        created_at: Utc::now(),
        stripe_coupon_id: None,
    }
}

#[derive(Default)]
struct GatewayState {
    intents: Vec<PaymentIntentRequest>,
    sessions: Vec<CheckoutSessionRequest>,
    invoice_lookups: Vec<String>,
    deleted_coupons: Vec<String>,
    fail: bool,
    omit_client_secret: bool,
    invoice: Option<InvoiceLinks>,
    receipt_url: Option<String>,
}

/// Records every request; answers with canned data
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as an unreachable Stripe would
    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().fail = true;
        gateway
    }

    pub fn without_client_secret() -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().omit_client_secret = true;
        gateway
    }

    pub fn with_invoice(self, invoice: InvoiceLinks) -> Self {
        self.state.lock().unwrap().invoice = Some(invoice);
        self
    }

    pub fn with_receipt_url(self, url: &str) -> Self {
        self.state.lock().unwrap().receipt_url = Some(url.to_string());
        self
    }

    pub fn payment_intents(&self) -> Vec<PaymentIntentRequest> {
        self.state.lock().unwrap().intents.clone()
    }

    pub fn checkout_sessions(&self) -> Vec<CheckoutSessionRequest> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn invoice_lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().invoice_lookups.clone()
    }

    pub fn deleted_coupons(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_coupons.clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(GatewayError::Api("card_declined".to_string()));
        }
        state.intents.push(request.clone());
        let id = format!("pi_{}", state.intents.len());
        let client_secret = (!state.omit_client_secret).then(|| format!("{id}_secret"));
        Ok(PaymentIntent { id, client_secret })
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(GatewayError::Api("api_error".to_string()));
        }
        state.sessions.push(request.clone());
        let id = format!("cs_{}", state.sessions.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/{id}"),
            id,
        })
    }

    async fn retrieve_invoice(&self, invoice_id: &str) -> Result<InvoiceLinks, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.invoice_lookups.push(invoice_id.to_string());
        if state.fail {
            return Err(GatewayError::Api("resource_missing".to_string()));
        }
        Ok(state.invoice.clone().unwrap_or_default())
    }

    async fn retrieve_charge_receipt(
        &self,
        _charge_id: &str,
    ) -> Result<Option<String>, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.fail {
            return Err(GatewayError::Api("resource_missing".to_string()));
        }
        Ok(state.receipt_url.clone())
    }

    async fn create_coupon(&self, code: &DiscountCode) -> Result<String, GatewayError> {
        if self.state.lock().unwrap().fail {
            return Err(GatewayError::Api("api_error".to_string()));
        }
        Ok(format!("coupon_{}", code.code))
    }

    async fn delete_coupon(&self, coupon_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(GatewayError::Api("api_error".to_string()));
        }
        state.deleted_coupons.push(coupon_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct MailerState {
    receipts: Vec<(String, PurchaseReceipt)>,
    histories: Vec<(String, usize)>,
    fail: bool,
}

#[derive(Default)]
pub struct FakeMailer {
    state: Mutex<MailerState>,
}

impl FakeMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.state.lock().unwrap().fail = true;
        mailer
    }

    pub fn receipts(&self) -> Vec<(String, PurchaseReceipt)> {
        self.state.lock().unwrap().receipts.clone()
    }

    pub fn histories(&self) -> Vec<(String, usize)> {
        self.state.lock().unwrap().histories.clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_purchase_receipt(
        &self,
        to: &str,
        receipt: &PurchaseReceipt,
    ) -> Result<(), BoxError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err("mail relay unavailable".into());
        }
        state.receipts.push((to.to_string(), receipt.clone()));
        Ok(())
    }

    async fn send_order_history(
        &self,
        to: &str,
        orders: &[OrderHistoryEntry],
    ) -> Result<(), BoxError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err("mail relay unavailable".into());
        }
        state.histories.push((to.to_string(), orders.len()));
        Ok(())
    }
}
