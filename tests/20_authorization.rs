mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, ADMIN, PASSWORD, SUPER_ADMIN, USER};

#[tokio::test]
async fn api_requires_a_bearer_token() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app.request(Method::GET, "/api/users", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn wildcard_permission_reaches_every_route() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(SUPER_ADMIN).await?;

    // Guard passes; the handler answers 404 for the missing row
    let (status, body) = app.get("/api/roles/999", &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Role with ID 999 not found");

    for uri in ["/api/users", "/api/roles", "/api/permissions"] {
        let (status, _) = app.get(uri, &token).await?;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn anchored_pattern_only_matches_the_collection() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(USER).await?;

    let (status, _) = app.get("/api/users", &token).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/users/3", &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["statusCode"], 403);
    assert_eq!(body["message"], "Access denied");
    Ok(())
}

#[tokio::test]
async fn later_grant_for_the_same_url_wins() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(ADMIN).await?;

    // users:write (^/api/users.*$) replaced users:read for /api/users
    let (status, body) = app.get("/api/users/3", &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], USER);

    let (status, _) = app.get("/api/roles", &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn guard_is_path_based_regardless_of_method() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.login(USER).await?;

    // users:read matches /api/users, so the handler runs and validates the body
    let (status, _) = app.post("/api/users", Some(&token), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn role_changes_apply_after_refresh() -> Result<()> {
    let app = TestApp::spawn().await?;
    let super_token = app.login(SUPER_ADMIN).await?;
    let login = app.login_body(ADMIN, PASSWORD).await?;
    let admin_token = login["access_token"].as_str().unwrap().to_string();

    // Give admin roles:read on top of users:read/users:write
    let (status, _) = app
        .patch("/api/roles/2", &super_token, json!({ "permissionIds": [2, 3, 4] }))
        .await?;
    assert_eq!(status, StatusCode::OK);

    // The old token still carries the old map
    let (status, _) = app.get("/api/roles", &admin_token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/auth/refresh", None, json!({ "refresh_token": login["refresh_token"] }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["access_token"].as_str().unwrap();

    let (status, _) = app.get("/api/roles", fresh).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/roles/1", fresh).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn profile_is_not_behind_the_guard() -> Result<()> {
    let app = TestApp::spawn().await?;
    let body = app
        .post(
            "/auth/register",
            None,
            json!({ "name": "No Roles", "email": "noroles@example.com", "password": "secret1" }),
        )
        .await?
        .1;
    let token = body["access_token"].as_str().unwrap();

    let (status, body) = app.get("/auth/profile", token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"], json!([]));
    Ok(())
}

#[tokio::test]
async fn highest_role_id_still_honours_later_grant_within_a_role() -> Result<()> {
    let mut config = rbac_api_rust::config::AppConfig::for_tests();
    config.security.grant_precedence = rbac_api_rust::auth::GrantPrecedence::HighestRoleId;
    let app = TestApp::spawn_with(config).await?;
    let token = app.login(ADMIN).await?;

    let (status, body) = app.get("/api/users/3", &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], USER);
    Ok(())
}
