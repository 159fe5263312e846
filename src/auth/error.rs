use thiserror::Error;

use crate::database::DatabaseError;

/// Failures raised by credential checks, token handling and the authorization guard.
///
/// Display strings are client-facing, so credential and authorization
/// failures stay generic.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Authorization header must use Bearer token format")]
    InvalidAuthHeader,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Access denied")]
    Forbidden,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Registration is disabled")]
    RegistrationDisabled,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Directory(#[from] DatabaseError),
}

impl AuthError {
    /// True for the errors that answer with 401.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidAuthHeader
                | AuthError::TokenInvalid
                | AuthError::TokenExpired
        )
    }
}
