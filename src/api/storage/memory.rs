//! In-memory storage backend.
//!
//! Mirrors the PostgreSQL backend's query semantics over plain vectors. Used
//! by the test suites and for running the API without a database.

use std::collections::HashSet;
use std::sync::Arc;

use super::{StorageError, traits::*};
use crate::models::{
    AttachmentFile, CollaboratorView, NewSession, NewUser, NewWorkspace, Session,
    SessionAttachment, SessionCollaborator, SocialProfile, User, Workspace, WorkspaceUser,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Sequences {
    users: i64,
    sessions: i64,
    collaborators: i64,
    attachments: i64,
    workspaces: i64,
    workspace_users: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct MemoryData {
    seq: Sequences,
    users: Vec<User>,
    sessions: Vec<Session>,
    collaborators: Vec<SessionCollaborator>,
    attachments: Vec<SessionAttachment>,
    workspaces: Vec<Workspace>,
    workspace_users: Vec<WorkspaceUser>,
}

impl MemoryData {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .filter(|u| u.email == email)
            .min_by_key(|u| (u.password_hash.is_none(), u.name.is_none(), u.id))
    }

    fn user_mut(&mut self, user_id: i64) -> Result<&mut User, StorageError> {
        self.users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StorageError::NotFound {
                entity_type: "user".to_string(),
                entity_id: user_id.to_string(),
            })
    }

    fn insert_user(
        &mut self,
        name: Option<String>,
        email: String,
        password_hash: Option<String>,
        avatar: Option<String>,
    ) -> User {
        let now = Utc::now();
        let user = User {
            id: next_id(&mut self.seq.users),
            name,
            email,
            password_hash,
            avatar,
            created_at: now,
            updated_at: now,
        };
        self.users.push(user.clone());
        user
    }

    fn is_visible(&self, session: &Session, user_id: i64) -> bool {
        session.created_by == user_id
            || self
                .collaborators
                .iter()
                .any(|c| c.session_id == session.id && c.user_id == user_id)
    }

    fn collaborator_views(&self, session_ids: &HashSet<i64>) -> Vec<CollaboratorView> {
        // Links are stored in id order, which keeps insertion order.
        self.collaborators
            .iter()
            .filter(|c| session_ids.contains(&c.session_id))
            .filter_map(|c| {
                let user = self.users.iter().find(|u| u.id == c.user_id)?;
                Some(CollaboratorView {
                    id: c.id,
                    session_id: c.session_id,
                    user_id: c.user_id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                    avatar: user.avatar.clone(),
                    status: c.status,
                })
            })
            .collect()
    }
}

/// Storage backend holding everything in process memory.
#[derive(Clone, Default)]
pub struct MemoryStorageBackend {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a user row without touching the rows that reference it.
    pub async fn remove_user(&self, user_id: i64) -> bool {
        let mut data = self.data.lock().await;
        let before = data.users.len();
        data.users.retain(|u| u.id != user_id);
        data.users.len() != before
    }

    /// Number of user rows carrying `email`.
    pub async fn count_users_with_email(&self, email: &str) -> usize {
        let data = self.data.lock().await;
        data.users.iter().filter(|u| u.email == email).count()
    }

    /// Number of collaborator links recorded for a session.
    pub async fn count_session_links(&self, session_id: i64) -> usize {
        let data = self.data.lock().await;
        data.collaborators
            .iter()
            .filter(|c| c.session_id == session_id)
            .count()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorageBackend {
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>, StorageError> {
        let guard = self.data.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.user_by_email(email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut data = self.data.lock().await;
        Ok(data.insert_user(Some(user.name), user.email, Some(user.password_hash), None))
    }

    async fn claim_placeholder_user(
        &self,
        user_id: i64,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let mut data = self.data.lock().await;
        let user = data.user_mut(user_id)?;
        user.name = Some(name.to_string());
        user.password_hash = Some(password_hash.to_string());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn upsert_social_user(&self, profile: &SocialProfile) -> Result<User, StorageError> {
        let mut data = self.data.lock().await;
        match data.user_by_email(&profile.email).map(|u| u.id) {
            Some(id) => {
                let user = data.user_mut(id)?;
                user.name = Some(profile.name.clone());
                user.email = profile.email.clone();
                user.avatar = profile.avatar.clone();
                user.updated_at = Utc::now();
                Ok(user.clone())
            }
            None => Ok(data.insert_user(
                Some(profile.name.clone()),
                profile.email.clone(),
                None,
                profile.avatar.clone(),
            )),
        }
    }

    async fn get_session(&self, session_id: i64) -> Result<Option<Session>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.sessions.iter().find(|s| s.id == session_id).cloned())
    }

    async fn get_session_by_title(&self, title: &str) -> Result<Option<Session>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.sessions.iter().find(|s| s.title == title).cloned())
    }

    async fn list_visible_sessions(&self, user_id: i64) -> Result<Vec<Session>, StorageError> {
        let data = self.data.lock().await;
        let mut sessions: Vec<Session> = data
            .sessions
            .iter()
            .filter(|s| data.is_visible(s, user_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn is_session_visible(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<bool, StorageError> {
        let data = self.data.lock().await;
        Ok(data
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .is_some_and(|s| data.is_visible(s, user_id)))
    }

    async fn list_session_collaborators(
        &self,
        session_id: i64,
    ) -> Result<Vec<CollaboratorView>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.collaborator_views(&HashSet::from([session_id])))
    }

    async fn list_sessions_collaborators(
        &self,
        session_ids: &[i64],
    ) -> Result<Vec<CollaboratorView>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.collaborator_views(&session_ids.iter().copied().collect()))
    }

    async fn list_session_attachments(
        &self,
        session_id: i64,
        category: &str,
    ) -> Result<Vec<SessionAttachment>, StorageError> {
        let data = self.data.lock().await;
        Ok(data
            .attachments
            .iter()
            .filter(|a| a.session_id == session_id && a.category == category)
            .cloned()
            .collect())
    }

    async fn create_session_attachments(
        &self,
        session_id: i64,
        category: &str,
        files: &[AttachmentFile],
    ) -> Result<Vec<SessionAttachment>, StorageError> {
        let mut data = self.data.lock().await;
        if !data.sessions.iter().any(|s| s.id == session_id) {
            return Err(StorageError::QueryError(format!(
                "session {session_id} does not exist"
            )));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(files.len());
        for file in files {
            let attachment = SessionAttachment {
                id: next_id(&mut data.seq.attachments),
                session_id,
                url: file.url.clone(),
                name: file.name.clone(),
                category: category.to_string(),
                status: true,
                created_at: now,
                updated_at: now,
            };
            data.attachments.push(attachment.clone());
            created.push(attachment);
        }
        Ok(created)
    }

    async fn get_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.workspaces.iter().find(|w| w.name == name).cloned())
    }
}

/// Holds the store lock for its whole lifetime and applies its working copy
/// on commit. Reads through the backend block until it is committed or
/// dropped.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryData>,
    working: MemoryData,
}

#[async_trait]
impl StorageTransaction for MemoryTransaction {
    async fn session_exists(&mut self, session_id: i64) -> Result<bool, StorageError> {
        Ok(self.working.sessions.iter().any(|s| s.id == session_id))
    }

    async fn create_session(&mut self, session: NewSession) -> Result<Session, StorageError> {
        if !self.working.users.iter().any(|u| u.id == session.created_by) {
            return Err(StorageError::QueryError(format!(
                "user {} does not exist",
                session.created_by
            )));
        }

        let now = Utc::now();
        let session = Session {
            id: next_id(&mut self.working.seq.sessions),
            title: session.title,
            objective: session.objective,
            stage: session.stage,
            datetime: session.datetime,
            duration: session.duration,
            status: false,
            created_by: session.created_by,
            created_at: now,
            updated_at: now,
        };
        self.working.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_users_by_emails(
        &mut self,
        emails: &[String],
    ) -> Result<Vec<User>, StorageError> {
        let wanted: HashSet<&str> = emails.iter().map(String::as_str).collect();
        Ok(self
            .working
            .users
            .iter()
            .filter(|u| wanted.contains(u.email.as_str()))
            .cloned()
            .collect())
    }

    async fn create_placeholder_users(
        &mut self,
        emails: &[String],
    ) -> Result<Vec<User>, StorageError> {
        Ok(emails
            .iter()
            .map(|email| self.working.insert_user(None, email.clone(), None, None))
            .collect())
    }

    async fn create_session_collaborators(
        &mut self,
        session_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<SessionCollaborator>, StorageError> {
        if !self.working.sessions.iter().any(|s| s.id == session_id) {
            return Err(StorageError::QueryError(format!(
                "session {session_id} does not exist"
            )));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let link = SessionCollaborator {
                id: next_id(&mut self.working.seq.collaborators),
                session_id,
                user_id,
                status: false,
                created_at: now,
                updated_at: now,
            };
            self.working.collaborators.push(link.clone());
            created.push(link);
        }
        Ok(created)
    }

    async fn create_workspace(
        &mut self,
        workspace: NewWorkspace,
    ) -> Result<Workspace, StorageError> {
        let now = Utc::now();
        let workspace = Workspace {
            id: next_id(&mut self.working.seq.workspaces),
            name: workspace.name,
            avatar: workspace.avatar,
            role: workspace.role,
            status: true,
            created_at: now,
            updated_at: now,
        };
        self.working.workspaces.push(workspace.clone());
        Ok(workspace)
    }

    async fn count_primary_workspaces(&mut self, user_id: i64) -> Result<i64, StorageError> {
        let count = self
            .working
            .workspace_users
            .iter()
            .filter(|m| m.user_id == user_id && m.is_primary)
            .count();
        Ok(count as i64)
    }

    async fn create_workspace_user(
        &mut self,
        workspace_id: i64,
        user_id: i64,
        is_owner: bool,
        is_primary: bool,
    ) -> Result<WorkspaceUser, StorageError> {
        let now = Utc::now();
        let membership = WorkspaceUser {
            id: next_id(&mut self.working.seq.workspace_users),
            workspace_id,
            user_id,
            is_owner,
            is_primary,
            created_at: now,
            updated_at: now,
        };
        self.working.workspace_users.push(membership.clone());
        Ok(membership)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
