//! Critique session operations.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::collaborator_service::{group_by_session, link_collaborators, parse_collaborator_emails};
use super::error::{ServiceError, ServiceResult};
use super::object_storage::{SharedObjectStorage, attachment_object_key, stage_and_upload};
use crate::models::{
    ATTACHMENT_CATEGORY_ADD_FILES, AttachmentFile, CollaboratorResponse, NewSession,
    SessionAttachment, SessionResponse,
};
use crate::storage::StorageBackend;

/// A file received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Fields for a new session, as received from the client.
#[derive(Debug, Clone)]
pub struct CreateSessionInput {
    pub title: String,
    pub objective: String,
    pub stage: String,
    pub datetime: String,
    pub duration: i32,
    pub collaborators: Option<String>,
}

#[derive(Clone)]
pub struct SessionService {
    storage: Arc<dyn StorageBackend>,
    object_storage: SharedObjectStorage,
    staging_dir: PathBuf,
}

impl SessionService {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        object_storage: SharedObjectStorage,
        staging_dir: PathBuf,
    ) -> Self {
        Self {
            storage,
            object_storage,
            staging_dir,
        }
    }

    /// Sessions visible to the user, each with its collaborators.
    pub async fn list_sessions(&self, user_id: i64) -> ServiceResult<Vec<SessionResponse>> {
        let sessions = self.storage.list_visible_sessions(user_id).await?;
        let ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
        let rows = self.storage.list_sessions_collaborators(&ids).await?;

        Ok(sessions
            .into_iter()
            .zip(group_by_session(&ids, rows))
            .map(|(session, collaborators)| {
                SessionResponse::new(
                    session,
                    collaborators.into_iter().map(CollaboratorResponse::from).collect(),
                )
            })
            .collect())
    }

    /// Fail with `NotFound` unless the session exists and the user may see it.
    async fn ensure_visible(&self, session_id: i64, user_id: i64) -> ServiceResult<()> {
        if self.storage.is_session_visible(session_id, user_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("Session not found".to_string()))
        }
    }

    pub async fn get_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> ServiceResult<SessionResponse> {
        self.ensure_visible(session_id, user_id).await?;

        let session = self
            .storage
            .get_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Session not found".to_string()))?;
        let collaborators = self.storage.list_session_collaborators(session_id).await?;

        Ok(SessionResponse::new(
            session,
            collaborators.into_iter().map(CollaboratorResponse::from).collect(),
        ))
    }

    /// Create a session and link its collaborators in one transaction.
    pub async fn create_session(
        &self,
        creator_id: i64,
        input: CreateSessionInput,
    ) -> ServiceResult<SessionResponse> {
        if self
            .storage
            .get_session_by_title(&input.title)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "Session with same title already exists".to_string(),
            ));
        }

        let emails = input
            .collaborators
            .as_deref()
            .map(parse_collaborator_emails)
            .unwrap_or_default();

        let mut tx = self.storage.begin().await?;
        let session = tx
            .create_session(NewSession {
                title: input.title,
                objective: input.objective,
                stage: input.stage,
                datetime: input.datetime,
                duration: input.duration,
                created_by: creator_id,
            })
            .await?;
        link_collaborators(tx.as_mut(), session.id, &emails).await?;
        tx.commit().await?;

        info!("User {} created session {}", creator_id, session.id);

        let collaborators = self.storage.list_session_collaborators(session.id).await?;
        Ok(SessionResponse::new(
            session,
            collaborators.into_iter().map(CollaboratorResponse::from).collect(),
        ))
    }

    pub async fn list_session_files(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> ServiceResult<Vec<SessionAttachment>> {
        self.ensure_visible(session_id, user_id).await?;
        Ok(self
            .storage
            .list_session_attachments(session_id, ATTACHMENT_CATEGORY_ADD_FILES)
            .await?)
    }

    /// Upload each file, record them as attachments and return the session's
    /// full attachment list.
    pub async fn add_session_files(
        &self,
        session_id: i64,
        user_id: i64,
        files: Vec<UploadedFile>,
    ) -> ServiceResult<Vec<SessionAttachment>> {
        self.ensure_visible(session_id, user_id).await?;

        let mut stored: Vec<AttachmentFile> = Vec::with_capacity(files.len());
        for file in files {
            let key = attachment_object_key(&file.file_name, Utc::now().timestamp());
            let url = stage_and_upload(
                self.object_storage.as_ref(),
                &self.staging_dir,
                &key,
                &file.bytes,
            )
            .await
            .inspect_err(|e| {
                warn!("Attachment upload for session {} failed: {}", session_id, e);
                if !stored.is_empty() {
                    let orphaned: Vec<&str> = stored.iter().map(|f| f.name.as_str()).collect();
                    warn!(
                        "Uploaded objects left unrecorded for session {}: {}",
                        session_id,
                        orphaned.join(", ")
                    );
                }
            })?;
            stored.push(AttachmentFile { name: key, url });
        }

        if !stored.is_empty() {
            self.storage
                .create_session_attachments(session_id, ATTACHMENT_CATEGORY_ADD_FILES, &stored)
                .await?;
            info!("Added {} files to session {}", stored.len(), session_id);
        }

        self.list_session_files(session_id, user_id).await
    }
}
