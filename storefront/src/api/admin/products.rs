//! Product and category administration

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::error::{AppError, ErrorCode};
use shared::models::{Category, CategoryCreate, Product, ProductAvailability, ProductInput, ProductListItem};
use uuid::Uuid;
use validator::Validate;

use crate::api::validation_error;
use crate::db;
use crate::db::products::DeleteProduct;
use crate::error::ServiceResult;
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::new(ErrorCode::ProductNotFound)
}

/// GET /api/admin/products
pub async fn list_products(
    State(state): State<AppState>,
) -> ServiceResult<Json<Vec<ProductListItem>>> {
    Ok(Json(db::products::list_with_order_counts(&state.pool).await?))
}

/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> ServiceResult<(StatusCode, Json<Product>)> {
    input.validate().map_err(|e| validation_error(&e))?;

    let id = Uuid::new_v4();
    db::products::create(&state.pool, id, &input).await?;
    let product = db::products::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(product_id = %id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/admin/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> ServiceResult<Json<Product>> {
    input.validate().map_err(|e| validation_error(&e))?;

    if !db::products::update(&state.pool, id, &input).await? {
        return Err(not_found().into());
    }
    let product = db::products::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(product))
}

/// POST /api/admin/products/{id}/availability
pub async fn set_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProductAvailability>,
) -> ServiceResult<Json<ProductAvailability>> {
    if !db::products::set_availability(&state.pool, id, req.is_available_for_purchase).await? {
        return Err(not_found().into());
    }
    Ok(Json(req))
}

/// DELETE /api/admin/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<StatusCode> {
    match db::products::delete(&state.pool, id).await? {
        DeleteProduct::Deleted => {
            tracing::info!(product_id = %id, "Product deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        DeleteProduct::HasOrders => Err(AppError::new(ErrorCode::ProductHasOrders).into()),
        DeleteProduct::NotFound => Err(not_found().into()),
    }
}

/// GET /api/admin/categories
pub async fn list_categories(State(state): State<AppState>) -> ServiceResult<Json<Vec<Category>>> {
    Ok(Json(db::products::list_categories(&state.pool).await?))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryCreate>,
) -> ServiceResult<(StatusCode, Json<Category>)> {
    input.validate().map_err(|e| validation_error(&e))?;

    let id = Uuid::new_v4();
    let name = input.name.trim().to_string();
    if !db::products::create_category(&state.pool, id, &name).await? {
        return Err(AppError::already_exists("Category").into());
    }
    Ok((StatusCode::CREATED, Json(Category { id, name })))
}
