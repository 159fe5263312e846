use std::sync::Arc;

use tracing::{info, warn};

use super::error::ServiceError;
use super::user_service::{CreateUser, UserService};
use crate::auth::{AuthError, CredentialVerifier, IssuedToken, PasswordHasher, TokenService};
use crate::database::models::User;
use crate::database::Directory;
use crate::types::EntityKind;

/// Tokens handed out by login, registration and refresh.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: IssuedToken,
    pub refresh_token: String,
    pub user: User,
}

pub struct AuthService {
    directory: Arc<dyn Directory>,
    verifier: CredentialVerifier,
    tokens: Arc<TokenService>,
    users: Arc<UserService>,
    hasher: PasswordHasher,
    allow_registration: bool,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn Directory>,
        verifier: CredentialVerifier,
        tokens: Arc<TokenService>,
        users: Arc<UserService>,
        allow_registration: bool,
    ) -> Self {
        let hasher = *verifier.hasher();
        Self {
            directory,
            verifier,
            tokens,
            users,
            hasher,
            allow_registration,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let user = self.verifier.verify(email, password).await?;
        let session = self.open_session(user)?;
        info!("User {} logged in", session.user.id);
        Ok(session)
    }

    /// Create a role-less account and log it in.
    pub async fn register(&self, name: String, email: String, password: String) -> Result<Session, ServiceError> {
        if !self.allow_registration {
            warn!("Registration attempt while registration is disabled");
            return Err(AuthError::RegistrationDisabled.into());
        }

        let user = self
            .users
            .create(CreateUser {
                name,
                email,
                password,
                role_ids: Vec::new(),
            })
            .await?;
        info!("Registered user {}", user.id);
        self.open_session(user)
    }

    pub async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(EntityKind::User, user_id))?;

        if !self.hasher.verify(current_password, &user.password_hash).await? {
            warn!("Password change rejected for user {}: wrong current password", user_id);
            return Err(AuthError::IncorrectPassword.into());
        }

        let hash = self.hasher.hash(new_password).await?;
        if !self.directory.update_password(user_id, &hash).await? {
            return Err(ServiceError::not_found(EntityKind::User, user_id));
        }
        info!("Password changed for user {}", user_id);
        Ok(())
    }

    /// Current state of the caller, re-read from the directory.
    pub async fn profile(&self, user_id: i32) -> Result<User, ServiceError> {
        self.directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(EntityKind::User, user_id))
    }

    /// Trade a refresh token for a fresh session with re-resolved permissions.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, ServiceError> {
        let claims = self.tokens.validate_refresh(refresh_token)?;
        let Some(user) = self.directory.find_user(claims.id).await? else {
            warn!("Refresh rejected: user {} is no longer active", claims.id);
            return Err(AuthError::TokenInvalid.into());
        };
        let session = self.open_session(user)?;
        info!("Session refreshed for user {}", session.user.id);
        Ok(session)
    }

    fn open_session(&self, user: User) -> Result<Session, ServiceError> {
        let access = self.tokens.issue_access(&user)?;
        let refresh_token = self.tokens.issue_refresh(&user)?;
        Ok(Session {
            access,
            refresh_token,
            user,
        })
    }
}
