// handlers/public/auth/register.rs - POST /auth/register handler
use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::format::LoginResponse;
use crate::api::requests::RegisterRequest;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /auth/register - Create an account without roles and log it in
///
/// Answers 201 with the same body as login, 409 when the email is taken
/// and 403 when registration is switched off.
pub async fn register_post(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload.map_err(ApiError::from)?;
    let registration = payload.validate()?;

    let session = state
        .auth
        .register(registration.name, registration.email, registration.password)
        .await?;
    Ok(ApiResponse::created(session.into()))
}
