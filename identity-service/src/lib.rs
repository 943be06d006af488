pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};

use crate::config::IdentityConfig;
use crate::middleware::{auth_middleware, require_permissions, RequiredPermissions};
use crate::services::catalog::{
    PERMISSIONS_READ, ROLES_MANAGE, ROLES_READ, USERS_MANAGE, USERS_READ,
};
use crate::services::{
    AdminService, AuthService, CredentialStore, EventPublisher, KeyMaterial, RoleResolver,
    ServiceError, TokenIssuer, TokenVerifier,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::well_known::jwks,
        handlers::auth::register,
        handlers::auth::login,
        handlers::user::get_me,
        handlers::user::update_me,
        handlers::user::change_password,
        handlers::user::get_user,
        handlers::user::assign_role,
        handlers::user::remove_role,
        handlers::role::list_roles,
        handlers::role::create_role,
        handlers::role::get_role,
        handlers::role::update_role,
        handlers::role::delete_role,
        handlers::role::set_role_permissions,
        handlers::permission::list_permissions,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::AuthResponse,
            dtos::auth::UpdateProfileRequest,
            dtos::auth::ChangePasswordRequest,
            dtos::auth::ProfileResponse,
            dtos::admin::CreateRoleRequest,
            dtos::admin::UpdateRoleRequest,
            dtos::admin::SetRolePermissionsRequest,
            dtos::admin::AssignRoleRequest,
            dtos::admin::UserAuthorizationResponse,
            services::IssuedToken,
            services::Jwk,
            services::JwkSet,
            models::UserResponse,
            models::RoleResponse,
            models::Permission,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "User", description = "Profiles and role assignment"),
        (name = "Roles", description = "Role administration"),
        (name = "Permissions", description = "Permission catalog"),
        (name = "Well-Known", description = "Public verification keys"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Wired services shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IdentityConfig>,
    pub store: Arc<dyn CredentialStore>,
    pub keys: KeyMaterial,
    pub verifier: TokenVerifier,
    pub auth_service: AuthService,
    pub admin_service: AdminService,
}

impl AppState {
    pub fn new(
        config: IdentityConfig,
        store: Arc<dyn CredentialStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Result<Self, ServiceError> {
        let keys = KeyMaterial::from_config(&config.jwt)?;
        Ok(Self::with_keys(config, store, events, keys))
    }

    pub fn with_keys(
        config: IdentityConfig,
        store: Arc<dyn CredentialStore>,
        events: Arc<dyn EventPublisher>,
        keys: KeyMaterial,
    ) -> Self {
        let resolver = RoleResolver::new(store.clone());
        let issuer = TokenIssuer::new(resolver, keys.clone(), &config.jwt);
        let verifier = TokenVerifier::new(&keys, &config.jwt.issuer, &config.jwt.audience);
        let auth_service = AuthService::new(
            store.clone(),
            issuer,
            events,
            config.bootstrap.admin_email.clone(),
        );
        let admin_service = AdminService::new(store.clone());

        Self {
            config: Arc::new(config),
            store,
            keys,
            verifier,
            auth_service,
            admin_service,
        }
    }
}

/// Routes that require every listed permission.
fn guarded(required: &[&str], routes: Router<AppState>) -> Router<AppState> {
    routes.route_layer(from_fn_with_state(
        RequiredPermissions::new(required),
        require_permissions,
    ))
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let protected = Router::new()
        .route(
            "/users/me",
            get(handlers::user::get_me).patch(handlers::user::update_me),
        )
        .route("/users/me/password", post(handlers::user::change_password))
        .merge(guarded(
            &[USERS_READ],
            Router::new().route("/users/:user_id", get(handlers::user::get_user)),
        ))
        .merge(guarded(
            &[USERS_MANAGE],
            Router::new()
                .route("/users/:user_id/roles", post(handlers::user::assign_role))
                .route(
                    "/users/:user_id/roles/:role_id",
                    delete(handlers::user::remove_role),
                ),
        ))
        .merge(guarded(
            &[ROLES_READ],
            Router::new()
                .route("/roles", get(handlers::role::list_roles))
                .route("/roles/:role_id", get(handlers::role::get_role)),
        ))
        .merge(guarded(
            &[ROLES_MANAGE],
            Router::new()
                .route("/roles", post(handlers::role::create_role))
                .route(
                    "/roles/:role_id",
                    patch(handlers::role::update_role).delete(handlers::role::delete_role),
                )
                .route(
                    "/roles/:role_id/permissions",
                    put(handlers::role::set_role_permissions),
                ),
        ))
        .merge(guarded(
            &[PERMISSIONS_READ],
            Router::new().route(
                "/permissions",
                get(handlers::permission::list_permissions),
            ),
        ))
        // Outermost, so the guards above always see an AuthContext
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
        })
        .collect::<Result<Vec<HeaderValue>, AppError>>()?;

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/.well-known/jwks.json", get(handlers::well_known::jwks))
        .route(
            "/.well-known/openapi.json",
            get(handlers::well_known::openapi),
        )
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(service_core::middleware::REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Credential store unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Credential store health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "signing_key": state.keys.has_signing_key(),
        "verification_key": state.keys.has_verification_key(),
    })))
}
