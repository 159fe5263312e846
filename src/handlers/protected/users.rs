// handlers/protected/users.rs - /api/users and /api/users/:id handlers
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};

use crate::api::format::{MessageResponse, UserResponse};
use crate::api::requests::{CreateUserRequest, DeleteQuery, ListQuery, UpdateUserRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{EntityKind, Page};

/// POST /api/users - Create a user with an optional `roleIds` list
pub async fn user_post(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<UserResponse> {
    let Json(payload) = payload.map_err(ApiError::from)?;
    let user = state.users.create(payload.validate()?).await?;
    Ok(ApiResponse::created(user.into()))
}

/// GET /api/users?page&limit&name&email&roleId - Paginated, newest first
pub async fn users_get(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<UserResponse>> {
    let Query(query) = query.map_err(ApiError::from)?;
    let page = query.page();
    let users = state.users.list(&query.user_filter(), page).await?;
    Ok(ApiResponse::success(users.map(UserResponse::from)))
}

/// GET /api/users/:id
pub async fn user_get(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<UserResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let user = state.users.get(id).await?;
    Ok(ApiResponse::success(user.into()))
}

/// PATCH /api/users/:id - Partial update; `roleIds: []` clears every role
pub async fn user_patch(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<UserResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let Json(payload) = payload.map_err(ApiError::from)?;
    let user = state.users.update(id, payload.validate()?).await?;
    Ok(ApiResponse::success(user.into()))
}

/// DELETE /api/users/:id[?permanent=true]
pub async fn user_delete(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let Query(query) = query.map_err(ApiError::from)?;
    state.users.delete(id, query.permanent).await?;
    Ok(ApiResponse::success(MessageResponse::new(format!(
        "{} deleted successfully",
        EntityKind::User.label()
    ))))
}
