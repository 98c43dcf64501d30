//! Application state management.
//!
//! Defines the AppState struct that holds the shared handles every route
//! handler needs: storage, services, token verification and settings.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::middleware::rate_limit::{RateLimiterState, create_rate_limiter_with_quota};
use crate::services::{
    AuthService, JwtService, PasswordService, SessionService, SharedIdentityProvider,
    SharedJwtService, SharedObjectStorage, WorkspaceService,
};
use crate::storage::StorageBackend;

/// Application state shared across all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Storage backend (PostgreSQL in production, in-memory in tests)
    pub storage: Arc<dyn StorageBackend>,
    pub jwt: SharedJwtService,
    pub auth: AuthService,
    pub sessions: SessionService,
    pub workspaces: WorkspaceService,
    /// Quota shared by every `/auth` request
    pub auth_rate_limiter: RateLimiterState,
}

impl AppState {
    /// Build the state from already-constructed external handles.
    pub fn new(
        config: Config,
        storage: Arc<dyn StorageBackend>,
        object_storage: SharedObjectStorage,
        google: SharedIdentityProvider,
    ) -> Self {
        let jwt: SharedJwtService =
            Arc::new(JwtService::new(&config.jwt_secret, config.jwt_expiry_hours));
        let passwords = PasswordService::new(config.bcrypt_cost);
        let staging_dir = config.upload_staging_dir.clone();

        Self {
            auth: AuthService::new(storage.clone(), jwt.clone(), passwords, google),
            sessions: SessionService::new(
                storage.clone(),
                object_storage.clone(),
                staging_dir.clone(),
            ),
            workspaces: WorkspaceService::new(storage.clone(), object_storage, staging_dir),
            auth_rate_limiter: create_rate_limiter_with_quota(config.auth_rate_limit_per_minute),
            jwt,
            storage,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for RateLimiterState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_rate_limiter.clone()
    }
}
