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
    dtos::{
        admin::AssignRoleRequest,
        auth::{ChangePasswordRequest, UpdateProfileRequest},
    },
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

/// Current user's profile with freshly resolved roles and permissions
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth_service.profile(caller.user_id).await?;
    Ok(Json(profile))
}

/// Update the current user's name or avatar
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth_service
        .update_profile(caller.user_id, req)
        .await?;
    Ok(Json(user))
}

/// Change the current user's password
#[utoipa::path(
    post,
    path = "/users/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password is wrong or token invalid", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth_service
        .change_password(caller.user_id, req)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A user's resolved authorization
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User with roles and permissions", body = UserAuthorizationResponse),
        (status = 403, description = "Requires users:read", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.admin_service.user_authorization(user_id).await?;
    Ok(Json(user))
}

/// Assign a role to a user
#[utoipa::path(
    post,
    path = "/users/{user_id}/roles",
    params(("user_id" = Uuid, Path, description = "User id")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = UserAuthorizationResponse),
        (status = 403, description = "Requires users:manage", body = ErrorResponse),
        (status = 404, description = "User or role not found", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn assign_role(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(actor = %caller.user_id, user_id = %user_id, role_id = %req.role_id, "Assigning role");
    state.admin_service.assign_role(user_id, req.role_id).await?;
    let user = state.admin_service.user_authorization(user_id).await?;
    Ok(Json(user))
}

/// Remove a role from a user
#[utoipa::path(
    delete,
    path = "/users/{user_id}/roles/{role_id}",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("role_id" = Uuid, Path, description = "Role id")
    ),
    responses(
        (status = 204, description = "Role no longer assigned"),
        (status = 403, description = "Requires users:manage", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn remove_role(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(actor = %caller.user_id, user_id = %user_id, role_id = %role_id, "Removing role");
    state.admin_service.remove_role(user_id, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
