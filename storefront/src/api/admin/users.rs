//! Customer administration

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::error::{AppError, ErrorCode};
use shared::models::UserListItem;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> ServiceResult<Json<Vec<UserListItem>>> {
    Ok(Json(db::users::list(&state.pool).await?))
}

/// DELETE /api/admin/users/{id}
///
/// Removes the customer together with their orders.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServiceResult<StatusCode> {
    if !db::users::delete(&state.pool, id).await? {
        return Err(AppError::new(ErrorCode::CustomerNotFound).into());
    }
    tracing::info!(user_id = %id, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}
