use service_core::{
    axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};
use uuid::Uuid;

use crate::{
    dtos::admin::{CreateRoleRequest, SetRolePermissionsRequest, UpdateRoleRequest},
    utils::ValidatedJson,
    AppState,
};

/// List roles with their permissions
#[utoipa::path(
    get,
    path = "/roles",
    responses(
        (status = 200, description = "All roles", body = [RoleResponse]),
        (status = 403, description = "Requires roles:read", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin_service.list_roles().await?))
}

/// Create a role
#[utoipa::path(
    post,
    path = "/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 403, description = "Requires roles:manage", body = ErrorResponse),
        (status = 409, description = "Role already exists", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.admin_service.create_role(req).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// Get a role
#[utoipa::path(
    get,
    path = "/roles/{role_id}",
    params(("role_id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin_service.get_role(role_id).await?))
}

/// Rename or describe a role
#[utoipa::path(
    patch,
    path = "/roles/{role_id}",
    params(("role_id" = Uuid, Path, description = "Role id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Role name taken", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin_service.update_role(role_id, req).await?))
}

/// Delete a role and its grants
#[utoipa::path(
    delete,
    path = "/roles/{role_id}",
    params(("role_id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.admin_service.delete_role(role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace a role's permissions
#[utoipa::path(
    put,
    path = "/roles/{role_id}/permissions",
    params(("role_id" = Uuid, Path, description = "Role id")),
    request_body = SetRolePermissionsRequest,
    responses(
        (status = 200, description = "Permissions replaced", body = RoleResponse),
        (status = 400, description = "Unknown permission names", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
pub async fn set_role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SetRolePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state
        .admin_service
        .set_role_permissions(role_id, req.permissions)
        .await?;
    Ok(Json(role))
}
