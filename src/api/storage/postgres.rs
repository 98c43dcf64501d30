//! PostgreSQL storage backend implementation.
//!
//! Uses sqlx for database operations and implements the StorageBackend trait.

use super::{StorageError, traits::*};
use crate::models::{
    AttachmentFile, CollaboratorView, NewSession, NewUser, NewWorkspace, Session,
    SessionAttachment, SessionCollaborator, SocialProfile, User, Workspace, WorkspaceUser,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

const USER_COLUMNS: &str = "id, name, email, password_hash, avatar, created_at, updated_at";
const SESSION_COLUMNS: &str =
    "id, title, objective, stage, datetime, duration, status, created_by, created_at, updated_at";
const ATTACHMENT_COLUMNS: &str =
    "id, session_id, url, name, category, status, created_at, updated_at";
const COLLABORATOR_VIEW_SELECT: &str = r#"
    SELECT sc.id, sc.session_id, sc.user_id, u.name, u.email, u.avatar, sc.status
    FROM session_collaborators sc
    INNER JOIN users u ON u.id = sc.user_id
"#;

/// PostgreSQL storage backend implementation.
pub struct PostgresStorageBackend {
    pool: PgPool,
}

impl PostgresStorageBackend {
    /// Create a new PostgreSQL storage backend.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StorageBackend for PostgresStorageBackend {
    async fn begin(&self) -> Result<Box<dyn StorageTransaction>, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            ORDER BY password_hash IS NULL, name IS NULL, id
            LIMIT 1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.name)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn claim_placeholder_user(
        &self,
        user_id: i64,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, password_hash = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(name)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StorageError::NotFound {
            entity_type: "user".to_string(),
            entity_id: user_id.to_string(),
        })
    }

    async fn upsert_social_user(&self, profile: &SocialProfile) -> Result<User, StorageError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM users
            WHERE email = $1
            ORDER BY password_hash IS NULL, name IS NULL, id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(&profile.email)
        .fetch_optional(&mut *tx)
        .await?;

        let user = match existing {
            Some(id) => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    UPDATE users
                    SET name = $2, email = $3, avatar = $4, updated_at = NOW()
                    WHERE id = $1
                    RETURNING {USER_COLUMNS}
                    "#
                ))
                .bind(id)
                .bind(&profile.name)
                .bind(&profile.email)
                .bind(&profile.avatar)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    INSERT INTO users (name, email, avatar)
                    VALUES ($1, $2, $3)
                    RETURNING {USER_COLUMNS}
                    "#
                ))
                .bind(&profile.name)
                .bind(&profile.email)
                .bind(&profile.avatar)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(user)
    }

    async fn get_session(&self, session_id: i64) -> Result<Option<Session>, StorageError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get_session_by_title(&self, title: &str) -> Result<Option<Session>, StorageError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE title = $1 ORDER BY id LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn list_visible_sessions(&self, user_id: i64) -> Result<Vec<Session>, StorageError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE created_by = $1
               OR id IN (SELECT session_id FROM session_collaborators WHERE user_id = $1)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn is_session_visible(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<bool, StorageError> {
        let visible: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE id = $1
                  AND (created_by = $2
                       OR id IN (SELECT session_id FROM session_collaborators WHERE user_id = $2))
            )
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(visible)
    }

    async fn list_session_collaborators(
        &self,
        session_id: i64,
    ) -> Result<Vec<CollaboratorView>, StorageError> {
        let rows = sqlx::query_as::<_, CollaboratorView>(&format!(
            "{COLLABORATOR_VIEW_SELECT} WHERE sc.session_id = $1 ORDER BY sc.id"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_sessions_collaborators(
        &self,
        session_ids: &[i64],
    ) -> Result<Vec<CollaboratorView>, StorageError> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, CollaboratorView>(&format!(
            "{COLLABORATOR_VIEW_SELECT} WHERE sc.session_id = ANY($1) ORDER BY sc.id"
        ))
        .bind(session_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_session_attachments(
        &self,
        session_id: i64,
        category: &str,
    ) -> Result<Vec<SessionAttachment>, StorageError> {
        let rows = sqlx::query_as::<_, SessionAttachment>(&format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
            FROM session_attachments
            WHERE session_id = $1 AND category = $2
            ORDER BY id
            "#
        ))
        .bind(session_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create_session_attachments(
        &self,
        session_id: i64,
        category: &str,
        files: &[AttachmentFile],
    ) -> Result<Vec<SessionAttachment>, StorageError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let urls: Vec<String> = files.iter().map(|f| f.url.clone()).collect();
        let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();

        let rows = sqlx::query_as::<_, SessionAttachment>(&format!(
            r#"
            INSERT INTO session_attachments (session_id, url, name, category, status)
            SELECT $1, f.url, f.name, $4, TRUE
            FROM UNNEST($2::text[], $3::text[]) AS f(url, name)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(&urls)
        .bind(&names)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn get_workspace_by_name(&self, name: &str) -> Result<Option<Workspace>, StorageError> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, avatar, role, status, created_at, updated_at
            FROM workspaces
            WHERE name = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(workspace)
    }
}

/// An open PostgreSQL transaction. Rolls back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StorageTransaction for PostgresTransaction {
    async fn session_exists(&mut self, session_id: i64) -> Result<bool, StorageError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM sessions WHERE id = $1)")
                .bind(session_id)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(exists)
    }

    async fn create_session(&mut self, session: NewSession) -> Result<Session, StorageError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (title, objective, stage, datetime, duration, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.title)
        .bind(session.objective)
        .bind(session.stage)
        .bind(session.datetime)
        .bind(session.duration)
        .bind(session.created_by)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(session)
    }

    async fn find_users_by_emails(
        &mut self,
        emails: &[String],
    ) -> Result<Vec<User>, StorageError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ANY($1) ORDER BY id"
        ))
        .bind(emails)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(users)
    }

    async fn create_placeholder_users(
        &mut self,
        emails: &[String],
    ) -> Result<Vec<User>, StorageError> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email)
            SELECT e.email FROM UNNEST($1::text[]) WITH ORDINALITY AS e(email, ord)
            ORDER BY e.ord
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(emails)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(users)
    }

    async fn create_session_collaborators(
        &mut self,
        session_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<SessionCollaborator>, StorageError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, SessionCollaborator>(
            r#"
            INSERT INTO session_collaborators (session_id, user_id)
            SELECT $1, c.user_id FROM UNNEST($2::bigint[]) WITH ORDINALITY AS c(user_id, ord)
            ORDER BY c.ord
            RETURNING id, session_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(session_id)
        .bind(user_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows)
    }

    async fn create_workspace(
        &mut self,
        workspace: NewWorkspace,
    ) -> Result<Workspace, StorageError> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (name, avatar, role)
            VALUES ($1, $2, $3)
            RETURNING id, name, avatar, role, status, created_at, updated_at
            "#,
        )
        .bind(workspace.name)
        .bind(workspace.avatar)
        .bind(workspace.role)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(workspace)
    }

    async fn count_primary_workspaces(&mut self, user_id: i64) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workspace_users WHERE user_id = $1 AND is_primary",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn create_workspace_user(
        &mut self,
        workspace_id: i64,
        user_id: i64,
        is_owner: bool,
        is_primary: bool,
    ) -> Result<WorkspaceUser, StorageError> {
        let membership = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            INSERT INTO workspace_users (workspace_id, user_id, is_owner, is_primary)
            VALUES ($1, $2, $3, $4)
            RETURNING id, workspace_id, user_id, is_owner, is_primary, created_at, updated_at
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(is_owner)
        .bind(is_primary)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(membership)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }
}
