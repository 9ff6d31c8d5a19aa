use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::Error;
use crate::server::AppState;
use crate::types::Session;

/// Extractor that requires a valid session bearer token.
pub struct RequireSession(pub Session);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidSession(String),
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AuthError::InvalidScheme => (
                StatusCode::UNAUTHORIZED,
                "Invalid authorization scheme".to_string(),
            ),
            AuthError::InvalidSession(message) => (StatusCode::UNAUTHORIZED, message),
            AuthError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Bearer realm=\"opslog\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingAuth)?;

        let raw_token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidScheme)?;

        match state.identity.restore(raw_token.trim()) {
            Ok(session) => Ok(RequireSession(session)),
            Err(Error::Auth(message)) => Err(AuthError::InvalidSession(message)),
            Err(e) => {
                tracing::error!("Session validation failed: {e}");
                Err(AuthError::InternalError)
            }
        }
    }
}
