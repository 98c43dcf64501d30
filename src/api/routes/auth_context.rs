//! Authentication context extractor.
//!
//! Resolves `Authorization: Bearer <token>` into the user it was issued for.
//! Requests without a valid token, or whose user no longer exists, are
//! rejected with 401 before the handler runs.

use super::app_state::AppState;
use super::error::ApiError;
use crate::models::User;
use crate::services::jwt_service::JwtService;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

/// Authentication context extracted from request
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(JwtService::extract_bearer_token)
            .ok_or_else(|| {
                tracing::debug!("No bearer token on {}", parts.uri.path());
                ApiError::unauthorized("Authorization header is missing")
            })?;

        let claims = state.jwt.verify_token(token).map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            ApiError::unauthorized("Invalid token")
        })?;

        let user = state.storage.get_user(claims.id).await?.ok_or_else(|| {
            tracing::warn!("Token for missing user {}", claims.id);
            ApiError::unauthorized("User not found")
        })?;

        Ok(AuthContext { user })
    }
}
