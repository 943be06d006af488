//! Role model - named bundles of permissions assignable to users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Permission;

/// Role entity. Names are unique system-wide.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub role_id: Uuid,
    pub role_name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Role {
    /// Create a new role.
    pub fn new(role_name: String, description: Option<String>) -> Self {
        Self {
            role_id: Uuid::new_v4(),
            role_name,
            description,
            created_utc: Utc::now(),
        }
    }
}

/// A role together with every permission granted through it.
#[derive(Debug, Clone)]
pub struct RoleWithPermissions {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Role with permission names for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub role_id: Uuid,
    pub role_name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub permissions: Vec<String>,
}

impl From<RoleWithPermissions> for RoleResponse {
    fn from(r: RoleWithPermissions) -> Self {
        let mut permissions: Vec<String> = r
            .permissions
            .into_iter()
            .map(|p| p.permission_name)
            .collect();
        permissions.sort();
        Self {
            role_id: r.role.role_id,
            role_name: r.role.role_name,
            description: r.role.description,
            created_utc: r.role.created_utc,
            permissions,
        }
    }
}
