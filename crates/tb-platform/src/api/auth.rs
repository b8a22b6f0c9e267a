//! Login API
//!
//! Issues bearer tokens for a `{username, role}` pair. There is no credential
//! check; the token only carries the claimed role.

use axum::{extract::Extension, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::middleware::{AppState, JsonBody};
use crate::error::PlatformError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Issue a token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing username or role", body = tb_common::ErrorBody)
    )
)]
pub async fn login(
    Extension(state): Extension<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, PlatformError> {
    let username = req.username.filter(|u| !u.trim().is_empty());
    let role = req.role.filter(|r| !r.trim().is_empty());

    let (Some(username), Some(role)) = (username, role) else {
        return Err(PlatformError::validation("username and role are required"));
    };

    let token = state.auth_service.issue_token(&username, &role)?;
    info!(username = %username, role = %role, "Token issued");

    Ok(Json(TokenResponse { token }))
}

pub fn auth_router() -> Router {
    Router::new().route("/login", post(login))
}
