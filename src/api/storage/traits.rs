//! Storage trait definitions for the API storage backends.

use super::StorageError;
use crate::models::{
    AttachmentFile, CollaboratorView, NewSession, NewUser, NewWorkspace, Session,
    SessionAttachment, SessionCollaborator, SocialProfile, User, Workspace, WorkspaceUser,
};

/// Storage backend trait for database operations.
///
/// Single-statement reads and writes live here; multi-step writes go through
/// a [`StorageTransaction`] obtained from [`StorageBackend::begin`].
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Start a transaction. Dropping it without `commit` rolls back.
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>, StorageError>;

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StorageError>;

    /// Get a user by exact email. When several rows share the email, accounts
    /// with a password win, then named accounts over placeholders, then the
    /// oldest row.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// Turn a placeholder into a registered account.
    async fn claim_placeholder_user(
        &self,
        user_id: i64,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StorageError>;

    /// Create or refresh the user matching the profile's email.
    async fn upsert_social_user(&self, profile: &SocialProfile) -> Result<User, StorageError>;

    async fn get_session(&self, session_id: i64) -> Result<Option<Session>, StorageError>;

    async fn get_session_by_title(&self, title: &str) -> Result<Option<Session>, StorageError>;

    /// Sessions the user created or collaborates on, each once, newest first.
    async fn list_visible_sessions(&self, user_id: i64) -> Result<Vec<Session>, StorageError>;

    async fn is_session_visible(&self, session_id: i64, user_id: i64)
    -> Result<bool, StorageError>;

    /// Collaborators of one session in link insertion order. Links whose user
    /// no longer exists are dropped.
    async fn list_session_collaborators(
        &self,
        session_id: i64,
    ) -> Result<Vec<CollaboratorView>, StorageError>;

    /// Batch form of [`StorageBackend::list_session_collaborators`]. The
    /// result is flat; callers group it by `session_id`.
    async fn list_sessions_collaborators(
        &self,
        session_ids: &[i64],
    ) -> Result<Vec<CollaboratorView>, StorageError>;

    async fn list_session_attachments(
        &self,
        session_id: i64,
        category: &str,
    ) -> Result<Vec<SessionAttachment>, StorageError>;

    async fn create_session_attachments(
        &self,
        session_id: i64,
        category: &str,
        files: &[AttachmentFile],
    ) -> Result<Vec<SessionAttachment>, StorageError>;

    async fn get_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>, StorageError>;
}

/// Writes that must commit or roll back together.
#[async_trait::async_trait]
pub trait StorageTransaction: Send {
    async fn session_exists(&mut self, session_id: i64) -> Result<bool, StorageError>;

    async fn create_session(&mut self, session: NewSession) -> Result<Session, StorageError>;

    /// Users whose email exactly matches one of `emails`.
    async fn find_users_by_emails(&mut self, emails: &[String])
    -> Result<Vec<User>, StorageError>;

    /// Insert one email-only user per entry, in one statement. The result
    /// follows the order of `emails`.
    async fn create_placeholder_users(
        &mut self,
        emails: &[String],
    ) -> Result<Vec<User>, StorageError>;

    async fn create_session_collaborators(
        &mut self,
        session_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<SessionCollaborator>, StorageError>;

    async fn create_workspace(&mut self, workspace: NewWorkspace)
    -> Result<Workspace, StorageError>;

    async fn count_primary_workspaces(&mut self, user_id: i64) -> Result<i64, StorageError>;

    async fn create_workspace_user(
        &mut self,
        workspace_id: i64,
        user_id: i64,
        is_owner: bool,
        is_primary: bool,
    ) -> Result<WorkspaceUser, StorageError>;

    async fn commit(self: Box<Self>) -> Result<(), StorageError>;
}
