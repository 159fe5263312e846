// handlers/public/auth/refresh.rs - POST /auth/refresh handler
use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::format::LoginResponse;
use crate::api::requests::RefreshRequest;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /auth/refresh - Exchange `{"refresh_token": "..."}` for a new token pair
///
/// Roles and permissions are resolved again, so changes made since the
/// last login take effect.
pub async fn refresh_post(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload.map_err(ApiError::from)?;
    let token = payload.validate()?;

    let session = state.auth.refresh(&token).await?;
    Ok(ApiResponse::success(session.into()))
}
