use std::sync::Arc;

use tracing::info;

use super::error::ServiceError;
use crate::auth::PasswordHasher;
use crate::database::models::{NewPermission, NewRole, NewUser};
use crate::database::Directory;
use crate::types::EntityKind;

const PERMISSIONS: &[(&str, &str, &str)] = &[
    ("all:*", "*", ".*"),
    ("users:read", "/api/users", "^/api/users$"),
    ("users:write", "/api/users", "^/api/users.*$"),
    ("roles:read", "/api/roles", "^/api/roles$"),
    ("roles:write", "/api/roles", "^/api/roles.*$"),
    ("permissions:read", "/api/permissions", "^/api/permissions$"),
    ("permissions:write", "/api/permissions", "^/api/permissions.*$"),
];

const ROLES: &[(&str, &[&str])] = &[
    ("super_admin", &["all:*"]),
    ("admin", &["users:read", "users:write"]),
    ("user", &["users:read"]),
];

const USERS: &[(&str, &str, &str)] = &[
    ("Super Administrator", "superadmin@example.com", "super_admin"),
    ("Administrator", "admin@example.com", "admin"),
    ("Regular User", "user@example.com", "user"),
    ("Test User", "test@example.com", "user"),
];

/// Number of rows created per kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions: usize,
    pub roles: usize,
    pub users: usize,
}

/// Populates an empty directory with the default permissions, roles and accounts.
///
/// Each kind is skipped when any row of it already exists.
pub struct Seeder {
    directory: Arc<dyn Directory>,
    hasher: PasswordHasher,
    default_password: String,
}

impl Seeder {
    pub fn new(directory: Arc<dyn Directory>, hasher: PasswordHasher, default_password: String) -> Self {
        Self {
            directory,
            hasher,
            default_password,
        }
    }

    pub async fn run(&self) -> Result<SeedReport, ServiceError> {
        let report = SeedReport {
            permissions: self.seed_permissions().await?,
            roles: self.seed_roles().await?,
            users: self.seed_users().await?,
        };
        info!(
            "Seeding finished: {} permissions, {} roles, {} users created",
            report.permissions, report.roles, report.users
        );
        Ok(report)
    }

    async fn seed_permissions(&self) -> Result<usize, ServiceError> {
        if self.directory.count(EntityKind::Permission).await? > 0 {
            info!("Permissions already exist, skipping");
            return Ok(0);
        }
        for (name, url, regex) in PERMISSIONS {
            self.directory
                .insert_permission(NewPermission {
                    name: name.to_string(),
                    url: url.to_string(),
                    regex: regex.to_string(),
                })
                .await?;
            info!("Created permission: {}", name);
        }
        Ok(PERMISSIONS.len())
    }

    async fn seed_roles(&self) -> Result<usize, ServiceError> {
        if self.directory.count(EntityKind::Role).await? > 0 {
            info!("Roles already exist, skipping");
            return Ok(0);
        }
        for (name, permission_names) in ROLES {
            let mut permission_ids = Vec::with_capacity(permission_names.len());
            for permission in *permission_names {
                if let Some(found) = self.directory.find_permission_by_name(permission).await? {
                    permission_ids.push(found.id);
                }
            }
            self.directory
                .insert_role(NewRole {
                    name: name.to_string(),
                    permission_ids,
                })
                .await?;
            info!("Created role: {}", name);
        }
        Ok(ROLES.len())
    }

    async fn seed_users(&self) -> Result<usize, ServiceError> {
        if self.directory.count(EntityKind::User).await? > 0 {
            info!("Users already exist, skipping");
            return Ok(0);
        }
        let password_hash = self.hasher.hash(&self.default_password).await?;
        for (name, email, role) in USERS {
            let role_ids = self
                .directory
                .find_role_by_name(role)
                .await?
                .map(|r| vec![r.id])
                .unwrap_or_default();
            self.directory
                .insert_user(NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash: password_hash.clone(),
                    role_ids,
                })
                .await?;
            info!("Created user: {} with role {}", email, role);
        }
        Ok(USERS.len())
    }
}
