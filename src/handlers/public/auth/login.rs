// handlers/public/auth/login.rs - POST /auth/login handler
use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::format::LoginResponse;
use crate::api::requests::LoginRequest;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /auth/login - Authenticate with email and password
///
/// Expected Input:
/// ```json
/// { "email": "admin@example.com", "password": "password123" }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "access_token": "eyJhbGciOiJIUzI1NiI...",
///   "refresh_token": "eyJhbGciOiJIUzI1NiI...",
///   "user": { "id": 2, "name": "Administrator", "email": "admin@example.com", "roles": [...] }
/// }
/// ```
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload.map_err(ApiError::from)?;
    let login = payload.validate()?;

    let session = state.auth.login(&login.email, &login.password).await?;
    Ok(ApiResponse::success(session.into()))
}
