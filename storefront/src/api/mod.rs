//! HTTP API for the storefront

pub mod admin;
pub mod checkout;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod products;
pub mod stripe_webhook;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router, middleware};
use http::HeaderValue;
use shared::error::AppError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use validator::ValidationErrors;

use crate::auth::admin_auth::admin_auth_middleware;
use crate::state::AppState;

/// Handlers that never touch the pool directly answer with plain `AppError`s
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Flatten validator output into a single `ValidationFailed` error
pub(crate) fn validation_error(errors: &ValidationErrors) -> AppError {
    let mut reasons: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .map(|e| e.message.as_ref().unwrap_or(&e.code).to_string())
                .unwrap_or_default();
            if field == "__all__" {
                reason
            } else {
                format!("{field}: {reason}")
            }
        })
        .collect();
    reasons.sort();
    AppError::validation(reasons.join("; "))
}

/// Blank coupon fields from the storefront mean "no coupon"
pub(crate) fn coupon_code(code: &Option<String>) -> Option<&str> {
    code.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(origin = allowed_origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

/// Create the combined router
pub fn router(state: AppState, allowed_origin: &str) -> Router {
    // Back office (admin JWT)
    let admin = Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route(
            "/api/admin/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/api/admin/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route(
            "/api/admin/products/{id}/availability",
            post(admin::set_availability),
        )
        .route(
            "/api/admin/categories",
            get(admin::list_categories).post(admin::create_category),
        )
        .route(
            "/api/admin/discount-codes",
            get(admin::list_discount_codes).post(admin::create_discount_code),
        )
        .route(
            "/api/admin/discount-codes/{id}",
            put(admin::update_discount_code).delete(admin::delete_discount_code),
        )
        .route(
            "/api/admin/discount-codes/{id}/toggle",
            post(admin::toggle_discount_code),
        )
        .route("/api/admin/orders", get(admin::list_orders))
        .route("/api/admin/orders/{id}", delete(admin::delete_order))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}", delete(admin::delete_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    // Storefront (anonymous)
    let storefront = Router::new()
        .route("/api/products", get(products::list_products))
        .route("/api/products/{id}", get(products::get_product))
        .route("/api/coupons/preview", post(coupons::preview))
        .route(
            "/api/checkout/payment-intent",
            post(checkout::create_payment_intent),
        )
        .route("/api/checkout/session", post(checkout::create_checkout_session))
        .route("/api/orders/{id}/status", get(orders::order_status))
        .route("/api/orders/history", post(orders::order_history));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(storefront)
        .merge(webhook)
        .merge(admin)
        .layer(cors_layer(allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use chrono::Utc;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use shared::models::{DiscountType, Order};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;
    use validator::Validate;

    use super::*;
    use crate::auth::admin_auth::{ADMIN_ROLE, create_token};
    use crate::config::Config;
    use crate::store::OrderStore;
    use crate::store::memory::MemoryStore;
    use crate::stripe::sign_payload;
    use crate::testing::{FakeGateway, FakeMailer, discount_code, product};

    const WEBHOOK_SECRET: &str = "whsec_test";
    const JWT_SECRET: &str = "jwt-test";

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/storefront_test".to_string(),
            http_port: 0,
            environment: "development".to_string(),
            ses_from_email: "shop@example.com".to_string(),
            stripe_secret_key: "sk_test".to_string(),
            stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
            jwt_secret: JWT_SECRET.to_string(),
            currency: "usd".to_string(),
            storefront_url: "http://localhost:3000".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
        }
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        let config = test_config();
        // Never connected: these tests only hit routes served from the store
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let state = AppState::from_parts(
            pool,
            store,
            Arc::new(FakeGateway::new()),
            Arc::new(FakeMailer::new()),
            &config,
        );
        router(state, &config.cors_origin)
    }

    async fn unpaid_order(store: &MemoryStore, discount_code_id: Option<Uuid>) -> Uuid {
        let user = store.upsert_user("buyer@example.com").await.unwrap();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: user.id,
            discount_code_id,
            product_id: None,
            price_paid_in_cents: 8000,
            is_paid: false,
            receipt_url: None,
            invoice_url: None,
            invoice_pdf_url: None,
            payment_reference: None,
            paid_at: None,
            created_at: Utc::now(),
        };
        let id = order.id;
        store.insert_order(order);
        id
    }

    fn webhook_request(body: &Value, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::post("/stripe/webhook").header("content-type", "application/json");
        if let Some(sig) = signature {
            builder = builder.header("stripe-signature", sig);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn signed(body: &Value) -> Option<String> {
        Some(sign_payload(
            body.to_string().as_bytes(),
            WEBHOOK_SECRET,
            Utc::now().timestamp(),
        ))
    }

    fn session_completed(event_id: &str, metadata: Value) -> Value {
        json!({
            "id": event_id,
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "payment_status": "paid",
                "metadata": metadata
            }}
        })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature_without_changes() {
        let store = Arc::new(MemoryStore::new());
        let order_id = unpaid_order(&store, None).await;
        let event = session_completed("evt_1", json!({ "order_id": order_id.to_string() }));
        let forged = sign_payload(event.to_string().as_bytes(), "whsec_other", Utc::now().timestamp());

        let response = app(store.clone())
            .oneshot(webhook_request(&event, Some(forged)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!store.order(order_id).unwrap().is_paid);
    }

    #[tokio::test]
    async fn test_webhook_requires_signature_header() {
        let store = Arc::new(MemoryStore::new());
        let order_id = unpaid_order(&store, None).await;
        let event = session_completed("evt_1", json!({ "order_id": order_id.to_string() }));

        let response = app(store.clone())
            .oneshot(webhook_request(&event, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!store.order(order_id).unwrap().is_paid);
    }

    #[tokio::test]
    async fn test_webhook_without_order_id_is_bad_request() {
        let store = Arc::new(MemoryStore::new());
        let event = session_completed("evt_1", json!({ "discount_code_id": "" }));

        let response = app(store)
            .oneshot(webhook_request(&event, signed(&event)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_double_delivery_counts_one_use() {
        let store = Arc::new(MemoryStore::new());
        let code = discount_code("SAVE20", DiscountType::Percentage, 20);
        store.insert_discount_code(code.clone());
        let order_id = unpaid_order(&store, Some(code.id)).await;
        let event = session_completed(
            "evt_1",
            json!({ "order_id": order_id.to_string(), "discount_code_id": code.id.to_string() }),
        );
        let app = app(store.clone());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(webhook_request(&event, signed(&event)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(store.order(order_id).unwrap().is_paid);
        assert_eq!(store.discount_code(code.id).unwrap().uses, 1);
    }

    fn delete_code_request(id: Uuid) -> Request<Body> {
        let token = create_token("ops@example.com", ADMIN_ROLE, JWT_SECRET).unwrap();
        Request::delete(format!("/api/admin/discount-codes/{id}"))
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_redeemed_discount_code_cannot_be_deleted() {
        let store = Arc::new(MemoryStore::new());
        let mut code = discount_code("SAVE20", DiscountType::Percentage, 20);
        code.uses = 1;
        store.insert_discount_code(code.clone());

        let response = app(store.clone())
            .oneshot(delete_code_request(code.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["code"], 7007);
        assert_eq!(
            body["message"],
            "Discount code has been used and cannot be deleted"
        );
        assert_eq!(store.discount_code(code.id).unwrap().uses, 1);
    }

    #[tokio::test]
    async fn test_discount_code_on_unpaid_order_cannot_be_deleted() {
        let store = Arc::new(MemoryStore::new());
        let code = discount_code("SAVE20", DiscountType::Percentage, 20);
        store.insert_discount_code(code.clone());
        let order_id = unpaid_order(&store, Some(code.id)).await;

        let response = app(store.clone())
            .oneshot(delete_code_request(code.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(store.discount_code(code.id).is_some());
        assert_eq!(store.order(order_id).unwrap().discount_code_id, Some(code.id));
    }

    #[tokio::test]
    async fn test_unused_discount_code_is_deleted() {
        let store = Arc::new(MemoryStore::new());
        let code = discount_code("SAVE20", DiscountType::Percentage, 20);
        store.insert_discount_code(code.clone());

        let response = app(store.clone())
            .oneshot(delete_code_request(code.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.discount_code(code.id).is_none());
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(Request::get("/api/admin/orders").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_non_admin_role() {
        let token = create_token("buyer@example.com", "customer", JWT_SECRET).unwrap();
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(
                Request::get("/api/admin/orders")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_token_signed_elsewhere_is_rejected() {
        let token = create_token("ops@example.com", ADMIN_ROLE, "some-other-secret").unwrap();
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(
                Request::get("/api/admin/dashboard")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_payment_intent_endpoint_returns_client_secret() {
        let store = Arc::new(MemoryStore::new());
        let item = product("Course", 10000);
        store.insert_product(item.clone());

        let response = app(store.clone())
            .oneshot(
                Request::post("/api/checkout/payment-intent")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "email": "Buyer@Example.com",
                            "product_id": item.id,
                            "coupon_code": "  "
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["amount"], 10000);
        assert!(body["client_secret"].as_str().unwrap().ends_with("_secret"));
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_error_uses_error_envelope() {
        let store = Arc::new(MemoryStore::new());
        let item = product("Course", 10000);
        store.insert_product(item.clone());

        let response = app(store.clone())
            .oneshot(
                Request::post("/api/checkout/payment-intent")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "email": "buyer@example.com",
                            "product_id": item.id,
                            "coupon_code": "NOPE"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Coupon has expired");
        assert!(store.orders().is_empty());
    }

    #[test]
    fn test_coupon_code_blank_is_none() {
        assert_eq!(coupon_code(&None), None);
        assert_eq!(coupon_code(&Some("   ".to_string())), None);
        assert_eq!(coupon_code(&Some(" SAVE20 ".to_string())), Some("SAVE20"));
    }

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn test_validation_error_names_field() {
        let errors = Named {
            name: String::new(),
        }
        .validate()
        .unwrap_err();
        let err = validation_error(&errors);
        assert_eq!(err.code, shared::error::ErrorCode::ValidationFailed);
        assert!(err.message.starts_with("name: "));
    }
}
