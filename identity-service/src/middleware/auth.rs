use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::services::{AccessTokenClaims, ServiceError};
use crate::AppState;

/// Authenticated caller, attached to request extensions once the token verified.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub organization_id: Option<Uuid>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl AuthContext {
    pub fn from_claims(claims: AccessTokenClaims) -> Result<Self, ServiceError> {
        Ok(Self {
            user_id: claims.user_id()?,
            email: claims.email,
            name: claims.name,
            organization_id: claims.org_id,
            roles: claims.roles,
            permissions: claims.permissions,
        })
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Token from `Authorization: Bearer <token>`. The scheme is case-insensitive.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Middleware to require a valid access token
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(req.headers()).ok_or(ServiceError::MissingToken)?;
    let claims = state.verifier.verify(token)?;
    let context = AuthContext::from_claims(claims)?;

    tracing::debug!(user_id = %context.user_id, "Authenticated request");
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Extractor to easily get the caller in handlers.
///
/// Rejects with 401 when no `AuthContext` is present.
pub struct AuthUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ServiceError::MissingToken.into())
    }
}
