mod common;

use axum::http::StatusCode;
use common::{test_config, TestApp, SIGNING_PUBLIC_KEY};

#[tokio::test]
async fn test_health_check_reports_key_material() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["service"], "identity-service");
    assert_eq!(response.body["signing_key"], true);
    assert_eq!(response.body["verification_key"], true);
}

#[tokio::test]
async fn test_health_check_with_verification_key_only() {
    let app = TestApp::with_config(test_config(None, Some(SIGNING_PUBLIC_KEY))).await;

    let response = app.get("/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["signing_key"], false);
    assert_eq!(response.body["verification_key"], true);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;

    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
