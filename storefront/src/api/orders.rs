//! Buyer-facing order endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::normalize_email;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

const HISTORY_MESSAGE: &str =
    "If we have orders for that address, you will receive an email with your order history.";

#[derive(Debug, Serialize)]
pub struct OrderStatus {
    pub order_id: Uuid,
    pub is_paid: bool,
}

/// GET /api/orders/{id}/status
///
/// Polled by the purchase success page until the webhook lands.
pub async fn order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<OrderStatus>> {
    let order = db::orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(OrderStatus {
        order_id: order.id,
        is_paid: order.is_paid,
    }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryRequest {
    pub email: String,
}

/// POST /api/orders/history
///
/// Always answers with the same message so the endpoint does not reveal
/// which addresses have bought something.
pub async fn order_history(
    State(state): State<AppState>,
    Json(req): Json<HistoryRequest>,
) -> Json<serde_json::Value> {
    let response = Json(serde_json::json!({ "message": HISTORY_MESSAGE }));

    let Some(email) = normalize_email(&req.email) else {
        return response;
    };

    let orders = match db::orders::paid_history(&state.pool, &email).await {
        Ok(orders) => orders,
        Err(e) => {
            tracing::error!(error = %e, "Order history query failed");
            return response;
        }
    };
    if orders.is_empty() {
        return response;
    }

    if let Err(e) = state.mailer.send_order_history(&email, &orders).await {
        tracing::warn!(error = %e, "Failed to send order history");
    }
    response
}
