use crate::{services::JwkSet, ApiDoc, AppState};
use service_core::{
    axum::{extract::State, http::header, response::IntoResponse, Json},
    error::AppError,
};
use utoipa::OpenApi;

/// Get JSON Web Key Set (JWKS)
#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    responses(
        (status = 200, description = "Public verification keys", body = JwkSet),
        (status = 500, description = "No public key configured", body = ErrorResponse)
    ),
    tag = "Well-Known"
)]
pub async fn jwks(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let jwks = state.keys.verification_key_set()?;
    Ok((
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(jwks),
    ))
}

/// OpenAPI document for this service
pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
