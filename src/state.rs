use std::sync::Arc;

use crate::auth::{
    AuthError, Clock, CredentialVerifier, PasswordHasher, PermissionResolver, SystemClock,
    TokenService,
};
use crate::config::AppConfig;
use crate::database::Directory;
use crate::services::{AuthService, PermissionService, RoleService, Seeder, UserService};

/// Shared handles passed to every handler through axum's `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn Directory>,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub roles: Arc<RoleService>,
    pub permissions: Arc<PermissionService>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(config.security.bcrypt_cost);
        let resolver = PermissionResolver::new(config.security.grant_precedence);
        let tokens = Arc::new(TokenService::new(&config.jwt, clock, resolver));

        let users = Arc::new(UserService::new(directory.clone(), hasher));
        let roles = Arc::new(RoleService::new(directory.clone()));
        let permissions = Arc::new(PermissionService::new(directory.clone()));

        let verifier = CredentialVerifier::new(directory.clone(), hasher)?;
        let auth = Arc::new(AuthService::new(
            directory.clone(),
            verifier,
            tokens.clone(),
            users.clone(),
            config.security.allow_registration,
        ));

        Ok(Self {
            config: Arc::new(config),
            directory,
            tokens,
            auth,
            users,
            roles,
            permissions,
        })
    }

    /// State on the wall clock.
    pub fn with_system_clock(config: AppConfig, directory: Arc<dyn Directory>) -> Result<Self, AuthError> {
        Self::new(config, directory, Arc::new(SystemClock))
    }

    pub fn seeder(&self) -> Seeder {
        Seeder::new(
            self.directory.clone(),
            PasswordHasher::new(self.config.security.bcrypt_cost),
            self.config.seed.default_password.clone(),
        )
    }
}
