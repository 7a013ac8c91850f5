//! Discount code administration

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{DiscountCode, DiscountCodeInput, DiscountCodeStatus};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::api::validation_error;
use crate::auth::AdminIdentity;
use crate::db;
use crate::db::discount_codes::UpdateDiscountCode;
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;
use crate::store::DeleteDiscountCode;
use crate::stripe::GatewayError;

#[derive(Debug, Error)]
pub enum DiscountCodeError {
    #[error("invalid discount code: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("Discount code already exists")]
    CodeTaken,
    #[error("Discount code not found")]
    NotFound,
    #[error("Discount code has been used and cannot be deleted")]
    InUse,
    #[error("Discount code is applied to unpaid orders and cannot be deleted")]
    Pending,
    #[error("Failed to create the Stripe coupon")]
    Mirror(#[source] GatewayError),
}

impl From<DiscountCodeError> for AppError {
    fn from(e: DiscountCodeError) -> Self {
        let message = e.to_string();
        match e {
            DiscountCodeError::Invalid(errors) => validation_error(&errors),
            DiscountCodeError::CodeTaken => {
                AppError::with_message(ErrorCode::DiscountCodeExists, message)
            }
            DiscountCodeError::NotFound => {
                AppError::with_message(ErrorCode::DiscountCodeNotFound, message)
            }
            DiscountCodeError::InUse | DiscountCodeError::Pending => {
                AppError::with_message(ErrorCode::DiscountCodeInUse, message)
            }
            DiscountCodeError::Mirror(err) => {
                tracing::error!(error = %err, "Stripe coupon mirroring failed");
                AppError::external(message)
            }
        }
    }
}

impl From<DiscountCodeError> for ServiceError {
    fn from(e: DiscountCodeError) -> Self {
        ServiceError::App(e.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<DiscountCodeStatus>,
}

/// GET /api/admin/discount-codes?status=active|expired
pub async fn list_discount_codes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ServiceResult<Json<Vec<DiscountCode>>> {
    let codes = db::discount_codes::list(&state.pool, query.status).await?;
    Ok(Json(codes))
}

/// POST /api/admin/discount-codes
pub async fn create_discount_code(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(input): Json<DiscountCodeInput>,
) -> ServiceResult<(StatusCode, Json<DiscountCode>)> {
    input.validate().map_err(DiscountCodeError::from)?;

    let id = Uuid::new_v4();
    if !db::discount_codes::create(&state.pool, id, &input).await? {
        return Err(DiscountCodeError::CodeTaken.into());
    }
    let mut code = db::discount_codes::find_by_id(&state.pool, id)
        .await?
        .ok_or(DiscountCodeError::NotFound)?;

    if input.mirror_to_stripe {
        match state.gateway.create_coupon(&code).await {
            Ok(coupon_id) => {
                db::discount_codes::set_stripe_coupon_id(&state.pool, id, &coupon_id).await?;
                code.stripe_coupon_id = Some(coupon_id);
            }
            Err(e) => {
                // Unused and unreferenced, so the delete cannot be refused
                db::discount_codes::delete(&state.pool, id).await?;
                return Err(DiscountCodeError::Mirror(e).into());
            }
        }
    }

    tracing::info!(
        admin = %identity.subject,
        code = %code.code,
        discount_type = code.discount_type.as_db(),
        amount = code.discount_amount,
        "Discount code created"
    );
    Ok((StatusCode::CREATED, Json(code)))
}

/// PUT /api/admin/discount-codes/{id}
///
/// `uses` is kept. A mirrored Stripe coupon is not rewritten; Stripe
/// coupons are immutable.
pub async fn update_discount_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<DiscountCodeInput>,
) -> ServiceResult<Json<DiscountCode>> {
    input.validate().map_err(DiscountCodeError::from)?;

    match db::discount_codes::update(&state.pool, id, &input).await? {
        UpdateDiscountCode::Updated => {}
        UpdateDiscountCode::CodeTaken => return Err(DiscountCodeError::CodeTaken.into()),
        UpdateDiscountCode::NotFound => return Err(DiscountCodeError::NotFound.into()),
    }
    let code = db::discount_codes::find_by_id(&state.pool, id)
        .await?
        .ok_or(DiscountCodeError::NotFound)?;
    Ok(Json(code))
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: Uuid,
    pub is_active: bool,
}

/// POST /api/admin/discount-codes/{id}/toggle
pub async fn toggle_discount_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<Json<ToggleResponse>> {
    let is_active = db::discount_codes::toggle_active(&state.pool, id)
        .await?
        .ok_or(DiscountCodeError::NotFound)?;
    tracing::info!(%id, is_active, "Discount code toggled");
    Ok(Json(ToggleResponse { id, is_active }))
}

/// DELETE /api/admin/discount-codes/{id}
///
/// Refused once the code is redeemed, and while unpaid orders carry it:
/// deleting it then would drop their `uses` increment at payment time.
pub async fn delete_discount_code(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Path(id): Path<Uuid>,
) -> ServiceResult<StatusCode> {
    let coupon_id = match state.store.delete_discount_code(id).await? {
        DeleteDiscountCode::Deleted(coupon_id) => coupon_id,
        DeleteDiscountCode::InUse => return Err(DiscountCodeError::InUse.into()),
        DeleteDiscountCode::Pending => return Err(DiscountCodeError::Pending.into()),
        DeleteDiscountCode::NotFound => return Err(DiscountCodeError::NotFound.into()),
    };

    if let Some(coupon_id) = coupon_id
        && let Err(e) = state.gateway.delete_coupon(&coupon_id).await
    {
        tracing::warn!(%id, coupon_id = %coupon_id, error = %e, "Failed to delete mirrored Stripe coupon");
    }

    tracing::info!(admin = %identity.subject, %id, "Discount code deleted");
    Ok(StatusCode::NO_CONTENT)
}
