use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::{self, AuthError, AuthUser};
use crate::error::ApiError;

/// Permission guard for `/api/*`. Runs after `jwt_auth_middleware`.
pub async fn authorize_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;

    auth::authorize(&user.permissions, request.method(), request.uri().path())?;

    Ok(next.run(request).await)
}
