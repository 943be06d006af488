use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::UserResponse;

/// Role names: 2 to 64 characters of `[a-z0-9_:-]`.
pub fn validate_role_name(name: &str) -> Result<(), ValidationError> {
    let valid_len = (2..=64).contains(&name.len());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | ':' | '-'));

    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(ValidationError::new("role_name")
            .with_message("Role name must be 2-64 characters of a-z, 0-9, '_', ':' or '-'".into()))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    #[validate(custom(function = "validate_role_name"))]
    #[schema(example = "support_agent")]
    pub name: String,

    #[validate(length(max = 500))]
    #[schema(example = "Handles customer tickets")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    #[validate(custom(function = "validate_role_name"))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Replaces the role's whole permission set.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetRolePermissionsRequest {
    #[schema(example = json!(["users:read", "projects:read"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignRoleRequest {
    pub role_id: Uuid,
}

/// A user together with their resolved authorization.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserAuthorizationResponse {
    pub user: UserResponse,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}
