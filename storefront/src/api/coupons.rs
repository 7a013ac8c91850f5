//! Apply-coupon preview

use axum::{Json, extract::State};
use serde::Deserialize;
use shared::models::Cart;

use super::ApiResult;
use crate::checkout::CouponPreview;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub code: String,
    pub cart: Cart,
}

/// POST /api/coupons/preview
pub async fn preview(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<CouponPreview> {
    let preview = state.checkout.preview_coupon(&req.code, &req.cart).await?;
    Ok(Json(preview))
}
