use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub avatar: String,
    pub role: String,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub name: String,
    pub role: String,
    pub avatar: String,
}

/// Membership of a user in a workspace.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct WorkspaceUser {
    pub id: i64,
    pub workspace_id: i64,
    pub user_id: i64,
    pub is_owner: bool,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkspaceResponse {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub membership: WorkspaceUser,
}
