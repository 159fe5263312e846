// handlers/public/system.rs - GET / and GET /health handlers
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service name, version and route overview
pub async fn root_get() -> Json<Value> {
    Json(json!({
        "name": "RBAC API (Rust)",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "User, role and permission management with JWT sessions",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "public_auth": "/auth/login, /auth/register, /auth/refresh (public - token acquisition)",
            "auth": "/auth/profile, /auth/change-password (token required)",
            "users": "/api/users[/:id] (token + permission)",
            "roles": "/api/roles[/:id] (token + permission)",
            "permissions": "/api/permissions[/:id] (token + permission)",
        }
    }))
}

/// GET /health - Liveness plus a storage round trip
pub async fn health_get(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.directory.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
