mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, ADMIN, PASSWORD, USER};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app.request(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.request(Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_returns_tokens_and_roles() -> Result<()> {
    let app = TestApp::spawn().await?;

    let body = app.login_body(ADMIN, PASSWORD).await?;
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], ADMIN);
    assert!(body["user"].get("password").is_none());

    let roles = body["user"]["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["name"], "admin");
    let names: Vec<&str> = roles[0]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert!(names.contains(&"users:read"));
    assert!(names.contains(&"users:write"));
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (wrong_status, wrong_body) = app
        .post("/auth/login", None, json!({ "email": ADMIN, "password": "not-the-password" }))
        .await?;
    let (unknown_status, unknown_body) = app
        .post("/auth/login", None, json!({ "email": "nobody@example.com", "password": PASSWORD }))
        .await?;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["message"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn login_rejects_malformed_input() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app
        .post("/auth/login", None, json!({ "email": "not-an-email", "password": "" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field_errors"]["email"], "Invalid email format");
    assert_eq!(body["field_errors"]["password"], "Password is required");
    Ok(())
}

#[tokio::test]
async fn disabled_account_cannot_log_in() -> Result<()> {
    let app = TestApp::spawn().await?;
    assert!(app.directory.set_enabled(rbac_api_rust::types::EntityKind::User, 3, false).await);

    let (status, body) = app
        .post("/auth/login", None, json!({ "email": USER, "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn register_creates_roleless_account() -> Result<()> {
    let app = TestApp::spawn().await?;
    let payload = json!({ "name": "New Person", "email": "new@example.com", "password": "secret1" });

    let (status, body) = app.post("/auth/register", None, payload.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["roles"], json!([]));

    // No roles means no permissions under /api
    let token = body["access_token"].as_str().unwrap().to_string();
    let (status, body) = app.get("/api/users", &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");

    let (status, body) = app.post("/auth/register", None, payload).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with this email already exists");
    Ok(())
}

#[tokio::test]
async fn register_can_be_switched_off() -> Result<()> {
    let mut config = rbac_api_rust::config::AppConfig::for_tests();
    config.security.allow_registration = false;
    let app = TestApp::spawn_with(config).await?;

    let (status, _) = app
        .post(
            "/auth/register",
            None,
            json!({ "name": "New Person", "email": "new@example.com", "password": "secret1" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn change_password_checks_current_password() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(USER).await?;

    let (status, body) = app
        .post(
            "/auth/change-password",
            Some(&token),
            json!({ "currentPassword": "wrong-one", "newPassword": "brand-new" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, body) = app
        .post(
            "/auth/change-password",
            Some(&token),
            json!({ "currentPassword": PASSWORD, "newPassword": "brand-new" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully");

    app.login_body(USER, "brand-new").await?;
    let (status, _) = app
        .post("/auth/login", None, json!({ "email": USER, "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn change_password_requires_token() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app
        .post(
            "/auth/change-password",
            None,
            json!({ "currentPassword": PASSWORD, "newPassword": "brand-new" }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);
    Ok(())
}

#[tokio::test]
async fn profile_reflects_the_caller() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(USER).await?;

    let (status, body) = app.get("/auth/profile", &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], USER);
    assert_eq!(body["roles"][0]["name"], "user");
    Ok(())
}

#[tokio::test]
async fn malformed_and_foreign_tokens_are_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app.get("/auth/profile", "not.a.jwt").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn expired_access_token_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(ADMIN).await?;

    app.clock.advance(60 * 60);
    let (status, body) = app.get("/auth/profile", &token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has expired");
    Ok(())
}

#[tokio::test]
async fn refresh_issues_a_new_pair() -> Result<()> {
    let app = TestApp::spawn().await?;
    let login = app.login_body(ADMIN, PASSWORD).await?;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    app.clock.advance(2 * 60 * 60);
    let (status, body) = app
        .post("/auth/refresh", None, json!({ "refresh_token": refresh_token }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let access = body["access_token"].as_str().unwrap();

    let (status, _) = app.get("/auth/profile", access).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn access_token_is_not_a_refresh_token() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(ADMIN).await?;

    let (status, _) = app
        .post("/auth/refresh", None, json!({ "refresh_token": token }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_fails_once_the_account_is_disabled() -> Result<()> {
    let app = TestApp::spawn().await?;
    let login = app.login_body(USER, PASSWORD).await?;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    app.directory
        .set_enabled(rbac_api_rust::types::EntityKind::User, 3, false)
        .await;
    let (status, _) = app
        .post("/auth/refresh", None, json!({ "refresh_token": refresh_token }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
