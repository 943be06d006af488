use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::sync::Arc;

use super::AuthContext;
use crate::services::ServiceError;

/// Permissions a route requires; all of them must be granted.
#[derive(Debug, Clone)]
pub struct RequiredPermissions(Arc<[String]>);

/// Outcome of checking a caller against a route's required permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Authorized,
    Forbidden { required: Vec<String> },
    Unauthenticated,
}

impl RequiredPermissions {
    pub fn new(permissions: &[&str]) -> Self {
        Self(permissions.iter().map(|p| p.to_string()).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Logical AND over the required set. No context fails closed.
    pub fn check(&self, context: Option<&AuthContext>) -> GuardDecision {
        let Some(context) = context else {
            return GuardDecision::Unauthenticated;
        };

        if self.0.iter().all(|required| context.has_permission(required)) {
            GuardDecision::Authorized
        } else {
            GuardDecision::Forbidden {
                required: self.0.to_vec(),
            }
        }
    }
}

/// Middleware that runs the handler only when the caller holds every required permission.
///
/// Must be layered inside `auth_middleware`.
pub async fn require_permissions(
    State(required): State<RequiredPermissions>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match required.check(req.extensions().get::<AuthContext>()) {
        GuardDecision::Authorized => Ok(next.run(req).await),
        GuardDecision::Forbidden { required } => {
            if let Some(context) = req.extensions().get::<AuthContext>() {
                tracing::warn!(
                    user_id = %context.user_id,
                    required = ?required,
                    granted = ?context.permissions,
                    path = %req.uri().path(),
                    "Insufficient permissions"
                );
            }
            Err(ServiceError::InsufficientPermissions { required }.into())
        }
        GuardDecision::Unauthenticated => {
            tracing::warn!(path = %req.uri().path(), "Permission guard reached without auth context");
            Err(ServiceError::MissingToken.into())
        }
    }
}
