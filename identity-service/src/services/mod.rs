//! Services layer for the identity service.
//!
//! Role resolution, token issuance and verification, key material, and the
//! account and administration operations built on the credential store.

pub mod admin;
pub mod auth;
pub mod catalog;
mod database;
pub mod error;
pub mod events;
mod jwt;
pub mod keys;
pub mod memory;
pub mod resolver;
pub mod store;

pub use admin::AdminService;
pub use auth::AuthService;
pub use database::Database;
pub use error::{ServiceError, TokenError};
pub use events::{EventPublisher, IdentityEvent};
pub use jwt::{
    parse_expires_in, AccessTokenClaims, IssuedToken, TokenIssuer, TokenVerifier,
    DEFAULT_TOKEN_LIFETIME_SECS, MAX_TOKEN_LIFETIME_SECS,
};
pub use keys::{key_id, Jwk, JwkSet, KeyMaterial};
pub use memory::InMemoryCredentialStore;
pub use resolver::{AuthInfo, RoleResolver};
pub use store::{CredentialStore, ProfileUpdate};
