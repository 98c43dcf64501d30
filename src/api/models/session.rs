use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// The only attachment category in use.
pub const ATTACHMENT_CATEGORY_ADD_FILES: &str = "add-files";

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Session {
    pub id: i64,
    pub title: String,
    pub objective: String,
    pub stage: String,
    /// Scheduled date and time, stored as submitted by the client.
    pub datetime: String,
    /// Planned duration in minutes.
    pub duration: i32,
    pub status: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub title: String,
    pub objective: String,
    pub stage: String,
    pub datetime: String,
    pub duration: i32,
    pub created_by: i64,
}

/// Join row between a session and a user.
#[derive(Debug, Clone, FromRow)]
pub struct SessionCollaborator {
    pub id: i64,
    pub session_id: i64,
    pub user_id: i64,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized collaborator row: a `SessionCollaborator` joined with its user.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct CollaboratorView {
    pub id: i64,
    pub session_id: i64,
    pub user_id: i64,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub status: bool,
}

/// Collaborator as nested inside a session response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CollaboratorResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub status: bool,
}

impl From<CollaboratorView> for CollaboratorResponse {
    fn from(view: CollaboratorView) -> Self {
        Self {
            id: view.id,
            user_id: view.user_id,
            name: view.name,
            email: view.email,
            avatar: view.avatar,
            status: view.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: i64,
    pub title: String,
    pub objective: String,
    pub stage: String,
    pub datetime: String,
    pub duration: i32,
    pub status: bool,
    pub created_by: i64,
    pub collaborators: Vec<CollaboratorResponse>,
}

impl SessionResponse {
    pub fn new(session: Session, collaborators: Vec<CollaboratorResponse>) -> Self {
        Self {
            id: session.id,
            title: session.title,
            objective: session.objective,
            stage: session.stage,
            datetime: session.datetime,
            duration: session.duration,
            status: session.status,
            created_by: session.created_by,
            collaborators,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SessionAttachment {
    pub id: i64,
    pub session_id: i64,
    pub url: String,
    pub name: String,
    pub category: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An uploaded file waiting to be recorded as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentFile {
    pub name: String,
    pub url: String,
}
