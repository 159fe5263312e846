use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::database::models::{Permission, Role, User};

/// Permission descriptor as carried inside tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionView {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub regex: String,
}

impl From<&Permission> for PermissionView {
    fn from(p: &Permission) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            url: p.url.clone(),
            regex: p.regex.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub id: i32,
    pub name: String,
    pub permissions: Vec<PermissionView>,
}

impl From<&Role> for RoleView {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
            permissions: role
                .permissions
                .iter()
                .filter(|p| p.is_active())
                .map(PermissionView::from)
                .collect(),
        }
    }
}

/// Records which role contributed a permission to the resolved set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub role_id: i32,
    pub role_name: String,
    pub permission: PermissionView,
}

/// Resolved permissions keyed by permission url.
pub type PermissionMap = BTreeMap<String, PermissionGrant>;

/// Access token payload.
///
/// `permissions` is a snapshot taken at issuance; changes in the directory
/// only show up once the holder gets a new token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub id: i32,
    pub email: String,
    pub roles: Vec<RoleView>,
    pub permissions: PermissionMap,
    pub iat: i64,
    pub exp: i64,
}

pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Refresh token payload. Carries identity only; permissions are re-resolved on use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: i32,
    pub email: String,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub roles: Vec<RoleView>,
    pub permissions: PermissionMap,
}

impl From<TokenPayload> for AuthUser {
    fn from(payload: TokenPayload) -> Self {
        Self {
            id: payload.id,
            email: payload.email,
            roles: payload.roles,
            permissions: payload.permissions,
        }
    }
}

pub fn role_views(user: &User) -> Vec<RoleView> {
    user.roles
        .iter()
        .filter(|r| r.is_active())
        .map(RoleView::from)
        .collect()
}
