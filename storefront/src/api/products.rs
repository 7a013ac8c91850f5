//! Public catalog endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::Product;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// GET /api/products
pub async fn list_products(State(state): State<AppState>) -> ServiceResult<Json<Vec<Product>>> {
    let products = db::products::list_available(&state.pool).await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
///
/// Unavailable products are hidden the same way as missing ones.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<Product>> {
    match db::products::find_by_id(&state.pool, id).await? {
        Some(product) if product.is_available_for_purchase => Ok(Json(product)),
        _ => Err(AppError::new(ErrorCode::ProductNotFound).into()),
    }
}
