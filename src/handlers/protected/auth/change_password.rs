// handlers/protected/auth/change_password.rs - POST /auth/change-password handler
use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::format::MessageResponse;
use crate::api::requests::ChangePasswordRequest;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /auth/change-password - Replace the caller's password
///
/// Expected Input:
/// ```json
/// { "currentPassword": "password123", "newPassword": "n3w-secret" }
/// ```
///
/// A wrong `currentPassword` is a 400, not a 401; the token stays valid.
pub async fn change_password_post(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(payload) = payload.map_err(ApiError::from)?;
    let change = payload.validate()?;

    state
        .auth
        .change_password(caller.id, &change.current_password, &change.new_password)
        .await?;
    Ok(ApiResponse::success(MessageResponse::new("Password changed successfully")))
}
