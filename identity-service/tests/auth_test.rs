mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{TestApp, TEST_PASSWORD};
use identity_service::services::IdentityEvent;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_register_returns_user_and_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "  Ada@Example.com ",
                "password": TEST_PASSWORD,
                "first_name": "Ada",
                "last_name": "Lovelace",
            })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["user"]["email"], "ada@example.com");
    assert_eq!(response.body["user"]["display_name"], "Ada Lovelace");
    assert!(response.body["user"].get("password_hash").is_none());
    assert_eq!(response.body["token"]["token_type"], "Bearer");
    assert_eq!(response.body["token"]["expires_in"], 3600);

    let token = response.body["token"]["access_token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);
}

#[tokio::test]
async fn test_register_publishes_user_registered_event() {
    let app = TestApp::new().await;
    let (user_id, _) = app.register("events@example.com").await;

    let mut events = Vec::new();
    for _ in 0..50 {
        events = app.events.events().await;
        if !events.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(events.len(), 1);
    match &events[0] {
        IdentityEvent::UserRegistered {
            user_id: event_user,
            email,
            ..
        } => {
            assert_eq!(*event_user, user_id);
            assert_eq!(email, "events@example.com");
        }
    }
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.register("dup@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "DUP@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = TestApp::new().await;

    let short_password = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "short@example.com", "password": "short" })),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(short_password.body["error"], "Validation error");

    let bad_email = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_register_malformed_json_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\": "))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_success_and_failures_look_alike() {
    let app = TestApp::new().await;
    app.register("login@example.com").await;

    let token = app.login("LOGIN@example.com").await;
    assert!(!token.is_empty());

    let wrong_password = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "login@example.com", "password": "wrong-password" })),
        )
        .await;
    let unknown_user = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_bootstrap_admin_receives_admin_role() {
    let app = TestApp::new().await;
    let token = app.admin().await;

    let response = app.get("/users/me", Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["roles"], json!(["admin"]));
    assert_eq!(response.body["permissions"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let app = TestApp::new().await;
    let (_, token) = app.register("me@example.com").await;

    let profile = app.get("/users/me", Some(&token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["user"]["email"], "me@example.com");
    assert_eq!(profile.body["roles"], json!([]));
    assert_eq!(profile.body["permissions"], json!([]));

    let updated = app
        .request(
            Method::PATCH,
            "/users/me",
            Some(&token),
            Some(json!({ "first_name": "Grace", "avatar_url": "https://cdn.example.com/g.png" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["first_name"], "Grace");
    assert_eq!(updated.body["last_name"], "User");

    let bad_avatar = app
        .request(
            Method::PATCH,
            "/users/me",
            Some(&token),
            Some(json!({ "avatar_url": "not a url" })),
        )
        .await;
    assert_eq!(bad_avatar.status, StatusCode::UNPROCESSABLE_ENTITY);

    let wrong_current = app
        .request(
            Method::POST,
            "/users/me/password",
            Some(&token),
            Some(json!({ "current_password": "nope", "new_password": "a-new-password" })),
        )
        .await;
    assert_eq!(wrong_current.status, StatusCode::UNAUTHORIZED);

    let changed = app
        .request(
            Method::POST,
            "/users/me/password",
            Some(&token),
            Some(json!({ "current_password": TEST_PASSWORD, "new_password": "a-new-password" })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::NO_CONTENT);

    let old_password = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "me@example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(old_password.status, StatusCode::UNAUTHORIZED);

    let new_password = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "me@example.com", "password": "a-new-password" })),
        )
        .await;
    assert_eq!(new_password.status, StatusCode::OK);
}
