//! JWT Service for token generation and validation.
//!
//! Issues HS256 tokens that identify a user for the bearer-authenticated
//! routes. Tokens carry the user's id, name and email.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::models::User;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id as a string)
    pub sub: String,
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    /// Stored password hash of the user.
    // FIXME: clients decode this claim today; drop it once they stop reading it.
    pub password: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Token returned after authentication
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// JWT Service configuration
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_duration: Duration,
}

impl JwtService {
    /// Create a new JWT service with the given secret
    ///
    /// # Arguments
    /// * `secret` - The secret key for signing tokens (should be at least 32 bytes)
    /// * `expiry_hours` - Token lifetime
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_duration: Duration::hours(expiry_hours),
        }
    }

    /// Issue a token for a user
    pub fn issue_token(&self, user: &User) -> Result<String, String> {
        let now = Utc::now();
        let exp = now + self.token_duration;
        let claims = Claims {
            sub: user.id.to_string(),
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            password: user.password_hash.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| format!("Failed to encode token: {}", e))?;

        debug!("Issued token for user {}, expires: {}", user.id, exp);
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, String> {
        Ok(self.decode_token(token)?.claims)
    }

    /// Decode and validate a token (checks signature and expiration)
    fn decode_token(&self, token: &str) -> Result<TokenData<Claims>, String> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token has expired".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidToken => "Invalid token format".to_string(),
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                "Invalid token signature".to_string()
            }
            _ => format!("Token validation failed: {}", e),
        })
    }

    /// Extract bearer token from Authorization header
    pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
        auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Shared JWT service for use across the application
pub type SharedJwtService = Arc<JwtService>;
