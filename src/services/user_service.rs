use std::sync::Arc;

use tracing::info;

use super::error::ServiceError;
use crate::auth::PasswordHasher;
use crate::database::models::{NewUser, User, UserChanges, UserFilter};
use crate::database::repository::{distinct_ids, missing_ids};
use crate::database::Directory;
use crate::types::{EntityKind, Page, PageRequest};

const KIND: EntityKind = EntityKind::User;

/// Validated input for creating a user; the password is still plaintext here.
#[derive(Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_ids: Vec<i32>,
}

pub struct UserService {
    directory: Arc<dyn Directory>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(directory: Arc<dyn Directory>, hasher: PasswordHasher) -> Self {
        Self { directory, hasher }
    }

    pub async fn create(&self, input: CreateUser) -> Result<User, ServiceError> {
        self.ensure_email_free(&input.email, None).await?;
        let role_ids = self.resolve_roles(&input.role_ids).await?;
        let password_hash = self.hasher.hash(&input.password).await?;

        let user = self
            .directory
            .insert_user(NewUser {
                name: input.name,
                email: input.email,
                password_hash,
                role_ids,
            })
            .await
            .map_err(|e| ServiceError::from_write(KIND, e))?;
        info!("Created user {} with {} roles", user.id, user.roles.len());
        Ok(user)
    }

    pub async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, ServiceError> {
        Ok(self.directory.list_users(filter, page).await?)
    }

    pub async fn get(&self, id: i32) -> Result<User, ServiceError> {
        self.directory
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(KIND, id))
    }

    /// Apply `changes`; a supplied role list replaces the current one, an empty list clears it.
    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<User, ServiceError> {
        let current = self.get(id).await?;
        if let Some(email) = changes.email.as_deref() {
            if email != current.email {
                self.ensure_email_free(email, Some(id)).await?;
            }
        }
        let role_ids = match changes.role_ids {
            Some(ids) => Some(self.resolve_roles(&ids).await?),
            None => None,
        };

        let user = self
            .directory
            .update_user(
                id,
                UserChanges {
                    name: changes.name,
                    email: changes.email,
                    role_ids,
                },
            )
            .await
            .map_err(|e| ServiceError::from_write(KIND, e))?
            .ok_or_else(|| ServiceError::not_found(KIND, id))?;
        info!("Updated user {}", id);
        Ok(user)
    }

    pub async fn delete(&self, id: i32, permanent: bool) -> Result<(), ServiceError> {
        super::delete_entity(self.directory.as_ref(), KIND, id, permanent).await
    }

    async fn resolve_roles(&self, requested: &[i32]) -> Result<Vec<i32>, ServiceError> {
        let ids = distinct_ids(requested);
        if ids.is_empty() {
            return Ok(ids);
        }
        let found: Vec<i32> = self
            .directory
            .find_roles_by_ids(&ids)
            .await?
            .iter()
            .map(|r| r.id)
            .collect();
        if found.len() < ids.len() {
            return Err(ServiceError::PartialReferenceFailure {
                kind: EntityKind::Role,
                missing: missing_ids(&ids, &found),
            });
        }
        Ok(ids)
    }

    async fn ensure_email_free(&self, email: &str, except: Option<i32>) -> Result<(), ServiceError> {
        match self.directory.find_user_by_email(email).await? {
            Some(other) if Some(other.id) != except => Err(ServiceError::DuplicateEmail),
            _ => Ok(()),
        }
    }
}
