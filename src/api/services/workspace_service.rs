//! Workspace creation.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::error::{ServiceError, ServiceResult};
use super::object_storage::{SharedObjectStorage, avatar_object_key, stage_and_upload};
use super::session_service::UploadedFile;
use crate::models::{NewWorkspace, WorkspaceResponse};
use crate::storage::StorageBackend;

#[derive(Clone)]
pub struct WorkspaceService {
    storage: Arc<dyn StorageBackend>,
    object_storage: SharedObjectStorage,
    staging_dir: PathBuf,
}

impl WorkspaceService {
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

    /// Upload the avatar, then create the workspace and the owner's
    /// membership together. The membership is primary when the user had no
    /// primary membership yet.
    pub async fn create_workspace(
        &self,
        owner_id: i64,
        name: String,
        role: String,
        avatar: UploadedFile,
    ) -> ServiceResult<WorkspaceResponse> {
        if self.storage.get_workspace_by_name(&name).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Workspace with same name already exists".to_string(),
            ));
        }

        let key = avatar_object_key(&avatar.file_name);
        let avatar_url = stage_and_upload(
            self.object_storage.as_ref(),
            &self.staging_dir,
            &key,
            &avatar.bytes,
        )
        .await?;

        let mut tx = self.storage.begin().await?;
        let workspace = tx
            .create_workspace(NewWorkspace {
                name,
                role,
                avatar: avatar_url,
            })
            .await?;
        let is_primary = tx.count_primary_workspaces(owner_id).await? == 0;
        let membership = tx
            .create_workspace_user(workspace.id, owner_id, true, is_primary)
            .await?;
        tx.commit().await?;

        info!(
            "User {} created workspace {} (primary: {})",
            owner_id, workspace.id, is_primary
        );
        Ok(WorkspaceResponse {
            workspace,
            membership,
        })
    }
}
