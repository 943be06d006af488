//! Permission model - atomic named capabilities (`resource:action`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Permission entity. Names are unique system-wide.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Permission {
    pub permission_id: Uuid,
    pub permission_name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Permission {
    pub fn new(permission_name: String, description: Option<String>) -> Self {
        Self {
            permission_id: Uuid::new_v4(),
            permission_name,
            description,
            created_utc: Utc::now(),
        }
    }
}
