use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// A user row.
///
/// Users invited as collaborators before they register exist as
/// placeholders: only `email` is populated.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// True for users created by collaborator invitation that never
    /// registered or signed in through a social provider.
    pub fn is_placeholder(&self) -> bool {
        self.name.is_none() && self.password_hash.is_none()
    }
}

/// Fields for a newly registered user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Profile returned by a social identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SocialProfile {
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// Public view of a user, never exposing the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
