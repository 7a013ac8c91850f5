//! Order administration

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::error::{AppError, ErrorCode};
use shared::models::OrderListItem;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// GET /api/admin/orders
pub async fn list_orders(State(state): State<AppState>) -> ServiceResult<Json<Vec<OrderListItem>>> {
    Ok(Json(db::orders::list(&state.pool).await?))
}

/// DELETE /api/admin/orders/{id}
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<StatusCode> {
    if !db::orders::delete(&state.pool, id).await? {
        return Err(AppError::new(ErrorCode::OrderNotFound).into());
    }
    tracing::info!(order_id = %id, "Order deleted");
    Ok(StatusCode::NO_CONTENT)
}
