// handlers/protected/permissions.rs - /api/permissions and /api/permissions/:id handlers
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    Json,
};

use crate::api::format::{MessageResponse, PermissionResponse};
use crate::api::requests::{CreatePermissionRequest, DeleteQuery, ListQuery, UpdatePermissionRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{EntityKind, Page};

/// POST /api/permissions - Create a permission; `regex` must compile
pub async fn permission_post(
    State(state): State<AppState>,
    payload: Result<Json<CreatePermissionRequest>, JsonRejection>,
) -> ApiResult<PermissionResponse> {
    let Json(payload) = payload.map_err(ApiError::from)?;
    let permission = state.permissions.create(payload.validate()?).await?;
    Ok(ApiResponse::created(permission.into()))
}

/// GET /api/permissions?page&limit&name&url - Paginated, newest first
pub async fn permissions_get(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<PermissionResponse>> {
    let Query(query) = query.map_err(ApiError::from)?;
    let page = query.page();
    let permissions = state.permissions.list(&query.permission_filter(), page).await?;
    Ok(ApiResponse::success(permissions.map(PermissionResponse::from)))
}

/// GET /api/permissions/:id
pub async fn permission_get(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<PermissionResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let permission = state.permissions.get(id).await?;
    Ok(ApiResponse::success(permission.into()))
}

/// PATCH /api/permissions/:id - Partial update of name, url or regex
pub async fn permission_patch(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdatePermissionRequest>, JsonRejection>,
) -> ApiResult<PermissionResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let Json(payload) = payload.map_err(ApiError::from)?;
    let permission = state.permissions.update(id, payload.validate()?).await?;
    Ok(ApiResponse::success(permission.into()))
}

/// DELETE /api/permissions/:id[?permanent=true]
pub async fn permission_delete(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let Path(id) = id.map_err(ApiError::from)?;
    let Query(query) = query.map_err(ApiError::from)?;
    state.permissions.delete(id, query.permanent).await?;
    Ok(ApiResponse::success(MessageResponse::new(format!(
        "{} deleted successfully",
        EntityKind::Permission.label()
    ))))
}
