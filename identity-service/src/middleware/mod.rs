pub mod auth;
pub mod permission;

pub use auth::{auth_middleware, extract_bearer, AuthContext, AuthUser};
pub use permission::{require_permissions, GuardDecision, RequiredPermissions};
