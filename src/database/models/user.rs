use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::role::Role;

/// A directory user with roles (and their permissions) eagerly loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub roles: Vec<Role>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.enable && !self.deleted
    }
}

// Hand-written so the password hash never lands in a log line.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("enable", &self.enable)
            .field("deleted", &self.deleted)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password: String,
    pub enable: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self, roles: Vec<Role>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password,
            enable: self.enable,
            deleted: self.deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
            roles,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_ids: Vec<i32>,
}

/// `role_ids: Some(ids)` replaces the whole membership set; `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<i32>,
}
