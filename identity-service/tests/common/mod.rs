//! Test helper module for identity-service integration tests.
//!
//! Builds the full router over the in-memory credential store and drives it
//! with `tower::ServiceExt::oneshot`, so no database or listener is needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use identity_service::{
    build_router,
    config::{
        BootstrapConfig, DatabaseConfig, Environment, EventsConfig, IdentityConfig, JwtConfig,
        SecurityConfig, StoreBackend, StoreConfig,
    },
    services::{
        catalog::reconcile_catalog, events::RecordingEventPublisher, CredentialStore,
        InMemoryCredentialStore,
    },
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const SIGNING_PRIVATE_KEY: &str = include_str!("../fixtures/signing_private.pem");
pub const SIGNING_PUBLIC_KEY: &str = include_str!("../fixtures/signing_public.pem");
pub const ROGUE_PRIVATE_KEY: &str = include_str!("../fixtures/rogue_private.pem");

pub const TEST_ISSUER: &str = "identity-test";
pub const TEST_AUDIENCE: &str = "identity-test-clients";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn test_config(private_key: Option<&str>, public_key: Option<&str>) -> IdentityConfig {
    IdentityConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "identity-service".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        store: StoreConfig {
            backend: StoreBackend::Memory,
            database: DatabaseConfig {
                url: "postgres://unused".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
        },
        jwt: JwtConfig {
            issuer: TEST_ISSUER.to_string(),
            audience: TEST_AUDIENCE.to_string(),
            expires_in: "1h".to_string(),
            private_key_pem: private_key.map(str::to_string),
            public_key_pem: public_key.map(str::to_string),
        },
        events: EventsConfig {
            webhook_url: None,
            timeout_seconds: 1,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        bootstrap: BootstrapConfig {
            admin_email: Some("root@example.com".to_string()),
        },
    }
}

/// Test application backed by the in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn CredentialStore>,
    pub events: Arc<RecordingEventPublisher>,
}

/// Status, headers and parsed JSON body (`Value::Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config(
            Some(SIGNING_PRIVATE_KEY),
            Some(SIGNING_PUBLIC_KEY),
        ))
        .await
    }

    pub async fn with_config(config: IdentityConfig) -> Self {
        let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
        reconcile_catalog(store.as_ref())
            .await
            .expect("Failed to reconcile catalog");

        let events = Arc::new(RecordingEventPublisher::default());
        let state = AppState::new(config, store.clone(), events.clone())
            .expect("Failed to build app state");
        let router = build_router(state).expect("Failed to build router");

        Self {
            router,
            store,
            events,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    /// Register a user and return its id and first access token.
    pub async fn register(&self, email: &str) -> (Uuid, String) {
        let response = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "first_name": "Test",
                    "last_name": "User",
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        let user_id = response.body["user"]["user_id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("user_id in register response");
        let token = response.body["token"]["access_token"]
            .as_str()
            .expect("access_token in register response")
            .to_string();
        (user_id, token)
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"]["access_token"]
            .as_str()
            .expect("access_token in login response")
            .to_string()
    }

    pub async fn role_id(&self, role_name: &str) -> Uuid {
        self.store
            .find_role_by_name(role_name)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("role {} not seeded", role_name))
            .role_id
    }

    /// Register a user holding `roles` and return a token minted after the grant.
    pub async fn user_with_roles(&self, email: &str, roles: &[&str]) -> (Uuid, String) {
        let (user_id, _) = self.register(email).await;
        for role in roles {
            let role_id = self.role_id(role).await;
            self.store.assign_role(user_id, role_id).await.unwrap();
        }
        (user_id, self.login(email).await)
    }

    /// Bootstrap admin, granted the `admin` role at registration.
    pub async fn admin(&self) -> String {
        let (_, token) = self.register("root@example.com").await;
        token
    }
}
