// handlers/protected/roles.rs - /api/roles and /api/roles/:id handlers
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};

use crate::api::format::{MessageResponse, RoleResponse};
use crate::api::requests::{CreateRoleRequest, DeleteQuery, ListQuery, UpdateRoleRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{EntityKind, Page};

/// POST /api/roles - Create a role with an optional `permissionIds` list
pub async fn role_post(
    State(state): State<AppState>,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> ApiResult<RoleResponse> {
    let Json(payload) = payload.map_err(ApiError::from)?;
    let role = state.roles.create(payload.validate()?).await?;
    Ok(ApiResponse::created(role.into()))
}

/// GET /api/roles?page&limit&name - Paginated, newest first
pub async fn roles_get(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<RoleResponse>> {
    let Query(query) = query.map_err(ApiError::from)?;
    let page = query.page();
    let roles = state.roles.list(&query.role_filter(), page).await?;
    Ok(ApiResponse::success(roles.map(RoleResponse::from)))
}

/// GET /api/roles/:id
pub async fn role_get(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<RoleResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let role = state.roles.get(id).await?;
    Ok(ApiResponse::success(role.into()))
}

/// PATCH /api/roles/:id - Rename and/or replace `permissionIds` wholesale
pub async fn role_patch(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> ApiResult<RoleResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let Json(payload) = payload.map_err(ApiError::from)?;
    let role = state.roles.update(id, payload.validate()?).await?;
    Ok(ApiResponse::success(role.into()))
}

/// DELETE /api/roles/:id[?permanent=true]
pub async fn role_delete(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let Query(query) = query.map_err(ApiError::from)?;
    state.roles.delete(id, query.permanent).await?;
    Ok(ApiResponse::success(MessageResponse::new(format!(
        "{} deleted successfully",
        EntityKind::Role.label()
    ))))
}
