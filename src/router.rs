use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{authorize_middleware, jwt_auth_middleware};
use crate::state::AppState;

/// Complete application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security);

    let router = Router::new()
        // Public
        .route("/", get(public::root_get))
        .route("/health", get(public::health_get))
        .merge(auth_public_routes())
        // Token only
        .merge(auth_routes(&state))
        // Token + permission guard
        .merge(api_routes(&state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/login", post(auth::login_post))
        .route("/auth/register", post(auth::register_post))
        .route("/auth/refresh", post(auth::refresh_post))
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/auth/profile", get(auth::profile_get))
        .route("/auth/change-password", post(auth::change_password_post))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn api_routes(state: &AppState) -> Router<AppState> {
    use protected::{permissions, roles, users};

    Router::new()
        .route("/api/users", get(users::users_get).post(users::user_post))
        .route(
            "/api/users/:id",
            get(users::user_get)
                .patch(users::user_patch)
                .delete(users::user_delete),
        )
        .route("/api/roles", get(roles::roles_get).post(roles::role_post))
        .route(
            "/api/roles/:id",
            get(roles::role_get)
                .patch(roles::role_patch)
                .delete(roles::role_delete),
        )
        .route(
            "/api/permissions",
            get(permissions::permissions_get).post(permissions::permission_post),
        )
        .route(
            "/api/permissions/:id",
            get(permissions::permission_get)
                .patch(permissions::permission_patch)
                .delete(permissions::permission_delete),
        )
        // Layers run bottom-up: authenticate, then authorize
        .route_layer(from_fn(authorize_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

/// `None` when CORS is disabled; any origin when no list is configured.
fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    if security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any),
    )
}
