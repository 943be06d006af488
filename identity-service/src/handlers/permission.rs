use service_core::{
    axum::{extract::State, response::IntoResponse, Json},
    error::AppError,
};

use crate::AppState;

/// List the permission catalog
#[utoipa::path(
    get,
    path = "/permissions",
    responses(
        (status = 200, description = "All known permissions", body = [Permission]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Requires permissions:read", body = ErrorResponse)
    ),
    tag = "Permissions",
    security(("bearer_auth" = []))
)]
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state.admin_service.list_permissions().await?;
    Ok(Json(permissions))
}
