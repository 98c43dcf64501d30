//! Registration, login and social login.

use std::sync::Arc;

use tracing::{info, warn};

use super::error::{ServiceError, ServiceResult};
use super::jwt_service::SharedJwtService;
use super::oauth_service::SharedIdentityProvider;
use super::password_service::PasswordService;
use crate::models::{NewUser, User};
use crate::storage::StorageBackend;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    storage: Arc<dyn StorageBackend>,
    jwt: SharedJwtService,
    passwords: PasswordService,
    google: SharedIdentityProvider,
}

impl AuthService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        jwt: SharedJwtService,
        passwords: PasswordService,
        google: SharedIdentityProvider,
    ) -> Self {
        Self {
            storage,
            jwt,
            passwords,
            google,
        }
    }

    fn issue(&self, user: &User) -> ServiceResult<String> {
        self.jwt.issue_token(user).map_err(ServiceError::Internal)
    }

    /// Register a new account, or claim the placeholder created when the
    /// email was invited as a collaborator.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ServiceResult<String> {
        let existing = self.storage.get_user_by_email(email).await?;
        if existing.as_ref().is_some_and(|u| !u.is_placeholder()) {
            return Err(ServiceError::Conflict(
                "User with same email already exists".to_string(),
            ));
        }

        let password_hash = self.passwords.hash(password)?;
        let user = match existing {
            Some(placeholder) => {
                info!("Registering invited user {}", placeholder.id);
                self.storage
                    .claim_placeholder_user(placeholder.id, name, &password_hash)
                    .await?
            }
            None => {
                self.storage
                    .create_user(NewUser {
                        name: name.to_string(),
                        email: email.to_string(),
                        password_hash,
                    })
                    .await?
            }
        };

        self.issue(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<String> {
        let user = self
            .storage
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::Auth(INVALID_CREDENTIALS.to_string()))?;

        let valid = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.passwords.verify(password, hash));
        if !valid {
            warn!("Failed login attempt for user {}", user.id);
            return Err(ServiceError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        self.issue(&user)
    }

    /// Sign in with a provider access token, creating or refreshing the user
    /// that matches the provider profile's email.
    pub async fn social_login(&self, provider: &str, access_token: &str) -> ServiceResult<String> {
        let identity = match provider {
            "google" => &self.google,
            other => {
                return Err(ServiceError::BadRequest(format!(
                    "Unsupported provider: {other}"
                )));
            }
        };

        let profile = identity.fetch_profile(access_token).await.map_err(|e| {
            warn!("Social login with {} failed: {:#}", provider, e);
            ServiceError::ExternalService("Failed to verify social login token".to_string())
        })?;

        let user = self.storage.upsert_social_user(&profile).await?;
        info!("Social login for user {} via {}", user.id, provider);
        self.issue(&user)
    }
}
