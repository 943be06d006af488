pub mod admin;
pub mod auth;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// `deserialize_with` helper dropping surrounding whitespace before validation runs.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// Error body produced by `AppError`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Insufficient permissions")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = json!(["roles:manage"]))]
    pub required: Option<Vec<String>>,
}
