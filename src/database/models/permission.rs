use chrono::{DateTime, Utc};
use sqlx::FromRow;


/// An authorizable request-path pattern.
///
/// `regex` is matched against request paths; `url` is only a label and keys
/// the resolved permission map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub regex: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Active permissions take part in lookups and resolution.
    pub fn is_active(&self) -> bool {
        self.enable && !self.deleted
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PermissionRow {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub regex: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            url: row.url,
            regex: row.regex,
            enable: row.enable,
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Permission row joined through `role_permission`, tagged with the owning role.
#[derive(Debug, Clone, FromRow)]
pub struct RolePermissionRow {
    pub role_id: i32,
    pub id: i32,
    pub name: String,
    pub url: String,
    pub regex: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RolePermissionRow {
    pub fn split(self) -> (i32, Permission) {
        (
            self.role_id,
            Permission {
                id: self.id,
                name: self.name,
                url: self.url,
                regex: self.regex,
                enable: self.enable,
                deleted: self.deleted,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    pub name: String,
    pub url: String,
    pub regex: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    pub regex: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionFilter {
    pub name: Option<String>,
    pub url: Option<String>,
}
