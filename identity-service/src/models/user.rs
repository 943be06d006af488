//! User model - identity records, local or externally authenticated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// How a user proves their identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email and password held by this service.
    Local,
    /// Delegated to an external identity verifier.
    External,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::External => "external",
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "external" => Ok(AuthProvider::External),
            _ => Err(format!("Invalid auth provider: {}", s)),
        }
    }
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    /// Absent for externally authenticated identities.
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
    pub organization_id: Option<Uuid>,
    pub avatar_url: Option<String>,
    /// Subject identifier at the external provider.
    pub provider_id: Option<String>,
    pub auth_provider: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    /// Create a new locally authenticated user.
    pub fn new_local(
        email: &str,
        password_hash: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: Some(password_hash),
            first_name,
            last_name,
            email_verified: false,
            organization_id: None,
            avatar_url: None,
            provider_id: None,
            auth_provider: AuthProvider::Local.as_str().to_string(),
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Create a user whose identity is asserted by an external provider.
    pub fn new_external(
        email: &str,
        provider_id: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: None,
            first_name,
            last_name,
            email_verified: true,
            organization_id: None,
            avatar_url: None,
            provider_id: Some(provider_id),
            auth_provider: AuthProvider::External.as_str().to_string(),
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn provider(&self) -> Option<AuthProvider> {
        self.auth_provider.parse().ok()
    }

    /// First and last name joined by a single space.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Convert to sanitized response (no sensitive fields).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// Emails are unique case-insensitively; stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email_verified: bool,
    pub organization_id: Option<Uuid>,
    pub avatar_url: Option<String>,
    pub auth_provider: String,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        let display_name = u.display_name();
        Self {
            user_id: u.user_id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            display_name,
            email_verified: u.email_verified,
            organization_id: u.organization_id,
            avatar_url: u.avatar_url,
            auth_provider: u.auth_provider,
            created_utc: u.created_utc,
        }
    }
}
