#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use rbac_api_rust::auth::ManualClock;
use rbac_api_rust::config::AppConfig;
use rbac_api_rust::database::MemoryDirectory;
use rbac_api_rust::AppState;

pub const PASSWORD: &str = "password123";
pub const SUPER_ADMIN: &str = "superadmin@example.com";
pub const ADMIN: &str = "admin@example.com";
pub const USER: &str = "user@example.com";
pub const TEST_USER: &str = "test@example.com";

/// In-process application over a seeded in-memory directory.
///
/// Seed ids: permissions all:*=1, users:read=2, users:write=3, roles:read=4,
/// roles:write=5, permissions:read=6, permissions:write=7; roles
/// super_admin=1, admin=2, user=3; users superadmin=1, admin=2, user=3, test=4.
pub struct TestApp {
    pub router: Router,
    pub directory: Arc<MemoryDirectory>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(AppConfig::for_tests()).await
    }

    pub async fn spawn_with(mut config: AppConfig) -> Result<Self> {
        config.seed.default_password = PASSWORD.to_string();

        let directory = Arc::new(MemoryDirectory::new());
        let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp()));
        let state = AppState::new(config, directory.clone(), clock.clone())?;
        state.seeder().run().await.context("seeding failed")?;

        Ok(Self {
            router: rbac_api_rust::app(state),
            directory,
            clock,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value)?)
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, json))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Full login response body.
    pub async fn login_body(&self, email: &str, password: &str) -> Result<Value> {
        let (status, body) = self
            .post("/auth/login", None, json!({ "email": email, "password": password }))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login for {} failed: {} {}", email, status, body);
        Ok(body)
    }

    /// Access token for a seeded account.
    pub async fn login(&self, email: &str) -> Result<String> {
        let body = self.login_body(email, PASSWORD).await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .context("login response without access_token")
    }
}
