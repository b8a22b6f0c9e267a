//! API Middleware
//!
//! Bearer token authentication and JSON body extraction for Axum.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::PlatformError;
use crate::service::{extract_bearer_token, AuthContext, AuthService};

/// Shared services every router needs, installed as a request extension
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        Self { auth_service }
    }
}

/// Extractor for authenticated requests.
///
/// A missing or malformed `Authorization` header is rejected with 403; a
/// token that fails verification with 400.
pub struct Authenticated(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| PlatformError::unauthorized("access denied, no token provided"))?;

        let token = extract_bearer_token(auth_header)
            .ok_or_else(|| PlatformError::unauthorized("invalid token format"))?;

        let app_state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| PlatformError::internal("AppState not found"))?;

        let claims = app_state.auth_service.validate_token(token)?;

        Ok(Authenticated(claims.into()))
    }
}

/// `Json` whose rejection renders as a 400 `INVALID_REQUEST` error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(PlatformError))]
pub struct JsonBody<T>(pub T);
