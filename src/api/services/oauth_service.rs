//! OAuth service for social login.
//!
//! Resolves a provider access token into the profile of the signed-in user.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::SocialProfile;

pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Something that can turn an access token into a user profile.
#[async_trait]
pub trait SocialIdentityProvider: Send + Sync {
    async fn fetch_profile(&self, access_token: &str) -> Result<SocialProfile>;
}

pub type SharedIdentityProvider = Arc<dyn SocialIdentityProvider>;

#[derive(Debug, Deserialize)]
struct GoogleUser {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleOAuthService {
    userinfo_url: String,
    http_client: reqwest::Client,
}

impl GoogleOAuthService {
    pub fn new(userinfo_url: String) -> Self {
        Self {
            userinfo_url,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SocialIdentityProvider for GoogleOAuthService {
    /// Fetch user information from the Google userinfo endpoint
    async fn fetch_profile(&self, access_token: &str) -> Result<SocialProfile> {
        let response = self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to fetch user info from Google")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Google userinfo returned {}: {}", status, error_text);
            return Err(anyhow::anyhow!("Google userinfo failed with {}", status));
        }

        let user: GoogleUser = response
            .json()
            .await
            .context("Failed to parse Google userinfo response")?;

        let email = user
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Google profile has no email address"))?;

        info!("Fetched Google profile for {}", email);

        Ok(SocialProfile {
            name: user.name.unwrap_or_else(|| email.clone()),
            email,
            avatar: user.picture,
        })
    }
}
