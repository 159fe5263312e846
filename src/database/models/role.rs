use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::permission::Permission;

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn is_active(&self) -> bool {
        self.enable && !self.deleted
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: i32,
    pub name: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleRow {
    /// Attach the eagerly loaded permission list.
    pub fn into_role(self, permissions: Vec<Permission>) -> Role {
        Role {
            id: self.id,
            name: self.name,
            enable: self.enable,
            deleted: self.deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
            permissions,
        }
    }
}

/// Role row joined through `user_roles`, tagged with the owning user.
#[derive(Debug, Clone, FromRow)]
pub struct UserRoleRow {
    pub user_id: i32,
    pub id: i32,
    pub name: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRoleRow {
    pub fn split(self) -> (i32, RoleRow) {
        (
            self.user_id,
            RoleRow {
                id: self.id,
                name: self.name,
                enable: self.enable,
                deleted: self.deleted,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub permission_ids: Vec<i32>,
}

/// `permission_ids: Some(ids)` replaces the whole membership set; `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleFilter {
    pub name: Option<String>,
}
