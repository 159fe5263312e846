use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::auth::GrantPrecedence;

pub mod duration;

pub use duration::parse_duration;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub api: ApiConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub storage: StorageKind,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub token_expiry: Duration,
    pub refresh_secret: String,
    pub refresh_expiry: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub bcrypt_cost: u32,
    pub allow_registration: bool,
    pub grant_precedence: GrantPrecedence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub on_startup: bool,
    pub default_password: String,
}

const DEV_JWT_SECRET: &str = "your-secret-key";
const DEV_REFRESH_SECRET: &str = "your-refresh-secret-key";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup, so tests never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };

        config.with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        self.database.url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        self.database.storage = match lookup("STORAGE").as_deref() {
            Some("postgres") => StorageKind::Postgres,
            Some("memory") => StorageKind::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "STORAGE",
                    value: other.to_string(),
                })
            }
            None if self.database.url.is_some() => StorageKind::Postgres,
            // Production never falls back to memory implicitly
            None if self.environment == Environment::Production => StorageKind::Postgres,
            None => StorageKind::Memory,
        };
        if self.database.storage == StorageKind::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // JWT overrides
        match lookup("JWT_SECRET") {
            Some(v) if !v.is_empty() => self.jwt.secret = v,
            _ if self.environment == Environment::Production => {
                return Err(ConfigError::Missing("JWT_SECRET"))
            }
            _ => {}
        }
        match lookup("JWT_REFRESH_SECRET") {
            Some(v) if !v.is_empty() => self.jwt.refresh_secret = v,
            _ if self.environment == Environment::Production => {
                return Err(ConfigError::Missing("JWT_REFRESH_SECRET"))
            }
            _ => {}
        }
        if let Some(v) = lookup("JWT_TOKEN_EXPIRY") {
            self.jwt.token_expiry = token_lifetime("JWT_TOKEN_EXPIRY", &v)?;
        }
        if let Some(v) = lookup("JWT_REFRESH_EXPIRY") {
            self.jwt.refresh_expiry = token_lifetime("JWT_REFRESH_EXPIRY", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("BCRYPT_COST") {
            let cost: u32 = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BCRYPT_COST",
                value: v.clone(),
            })?;
            if !(4..=31).contains(&cost) {
                return Err(ConfigError::InvalidValue { key: "BCRYPT_COST", value: v });
            }
            self.security.bcrypt_cost = cost;
        }
        if let Some(v) = lookup("AUTH_ALLOW_REGISTRATION") {
            self.security.allow_registration = v.parse().unwrap_or(self.security.allow_registration);
        }
        if let Some(v) = lookup("RBAC_GRANT_PRECEDENCE") {
            self.security.grant_precedence = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RBAC_GRANT_PRECEDENCE",
                value: v.clone(),
            })?;
        }

        // API overrides
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            self.api.log_format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }

        // Seed overrides
        if let Some(v) = lookup("SEED_ON_STARTUP") {
            self.seed.on_startup = v.parse().unwrap_or(self.seed.on_startup);
        }
        if let Some(v) = lookup("SEED_DEFAULT_PASSWORD") {
            self.seed.default_password = v;
        }

        Ok(self)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                storage: StorageKind::Memory,
                max_connections: 10,
                connection_timeout: 30,
            },
            jwt: JwtConfig {
                secret: DEV_JWT_SECRET.to_string(),
                token_expiry: Duration::from_secs(60 * 60),
                refresh_secret: DEV_REFRESH_SECRET.to_string(),
                refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: Vec::new(),
                bcrypt_cost: crate::auth::password::DEFAULT_COST,
                allow_registration: true,
                grant_precedence: GrantPrecedence::LastWriteWins,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                log_format: LogFormat::Text,
            },
            seed: SeedConfig {
                on_startup: true,
                default_password: "password123".to_string(),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.max_request_size_bytes = 5 * 1024 * 1024; // 5MB
        config.api.log_format = LogFormat::Json;
        config
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                storage: StorageKind::Postgres,
                max_connections: 50,
                connection_timeout: 5,
            },
            jwt: JwtConfig {
                secret: String::new(),
                token_expiry: Duration::from_secs(60 * 60),
                refresh_secret: String::new(),
                refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                bcrypt_cost: crate::auth::password::DEFAULT_COST,
                allow_registration: false,
                grant_precedence: GrantPrecedence::LastWriteWins,
            },
            api: ApiConfig {
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
                log_format: LogFormat::Json,
            },
            seed: SeedConfig {
                on_startup: false,
                default_password: "password123".to_string(),
            },
        }
    }

    /// Development preset with in-memory storage, cheap hashing and no seeding.
    pub fn for_tests() -> Self {
        let mut config = Self::development();
        config.security.bcrypt_cost = 4;
        config.seed.on_startup = false;
        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Token `exp` has one-second resolution, so shorter lifetimes expire on issue.
fn token_lifetime(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let lifetime = parse_duration(value)?;
    if lifetime < Duration::from_secs(1) {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(lifetime)
}
