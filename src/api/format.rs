use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::claims::role_views;
use crate::auth::{PermissionView, RoleView};
use crate::database::models::{Permission, Role, User};
use crate::services::Session;

/// Wire shape of a permission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub regex: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Permission> for PermissionResponse {
    fn from(p: Permission) -> Self {
        Self {
            id: p.id,
            name: p.name,
            url: p.url,
            regex: p.regex,
            enable: p.enable,
            deleted: p.deleted,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Wire shape of a role with its permissions embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub id: i32,
    pub name: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub permissions: Vec<PermissionView>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        let permissions = RoleView::from(&role).permissions;
        Self {
            id: role.id,
            name: role.name,
            enable: role.enable,
            deleted: role.deleted,
            created_at: role.created_at,
            updated_at: role.updated_at,
            permissions,
        }
    }
}

/// Wire shape of a user. The password hash is never part of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub roles: Vec<RoleView>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let roles = role_views(&user);
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            enable: user.enable,
            deleted: user.deleted,
            created_at: user.created_at,
            updated_at: user.updated_at,
            roles,
        }
    }
}

/// The caller as shown after login and on `/auth/profile`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub roles: Vec<RoleView>,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: role_views(user),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: SessionUser,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            user: SessionUser::from(&session.user),
            access_token: session.access.token,
            refresh_token: session.refresh_token,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
