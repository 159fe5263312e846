// handlers/protected/auth/profile.rs - GET /auth/profile handler
use axum::extract::State;

use crate::api::format::SessionUser;
use crate::auth::AuthUser;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /auth/profile - The caller with current roles, re-read from storage
pub async fn profile_get(State(state): State<AppState>, caller: AuthUser) -> ApiResult<SessionUser> {
    let user = state.auth.profile(caller.id).await?;
    Ok(ApiResponse::success(SessionUser::from(&user)))
}
