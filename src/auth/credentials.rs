use std::sync::Arc;

use tracing::{info, warn};

use super::error::AuthError;
use super::password::PasswordHasher;
use crate::database::models::User;
use crate::database::Directory;

/// Checks email/password pairs against the directory.
pub struct CredentialVerifier {
    directory: Arc<dyn Directory>,
    hasher: PasswordHasher,
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(directory: Arc<dyn Directory>, hasher: PasswordHasher) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash_blocking("not-a-real-password")?;
        Ok(Self {
            directory,
            hasher,
            dummy_hash,
        })
    }

    /// Return the active user owning `email` when `password` matches.
    ///
    /// Unknown emails and wrong passwords both yield [`AuthError::InvalidCredentials`],
    /// and both pay for one bcrypt verification.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.directory.find_user_by_email(email).await? else {
            self.hasher.verify(password, &self.dummy_hash).await?;
            warn!("Login failed: unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!("Login failed: password mismatch for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        info!("Credentials verified for user {}", user.id);
        Ok(user)
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }
}
