//! In-memory backend behaviour that the route tests rely on.

use critique_sessions_api::models::{
    ATTACHMENT_CATEGORY_ADD_FILES, AttachmentFile, NewSession, NewUser, NewWorkspace,
    SocialProfile,
};
use critique_sessions_api::storage::{MemoryStorageBackend, StorageBackend, StorageError};

fn new_user(name: &str, email: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "hash".to_string(),
    }
}

fn new_session(title: &str, created_by: i64) -> NewSession {
    NewSession {
        title: title.to_string(),
        objective: "objective".to_string(),
        stage: "stage".to_string(),
        datetime: "2024-05-01T10:00:00Z".to_string(),
        duration: 60,
        created_by,
    }
}

#[tokio::test]
async fn test_uncommitted_transaction_rolls_back() {
    let storage = MemoryStorageBackend::new();
    let owner = storage.create_user(new_user("O", "o@example.com")).await.unwrap();

    {
        let mut tx = storage.begin().await.unwrap();
        tx.create_session(new_session("Dropped", owner.id)).await.unwrap();
        tx.create_placeholder_users(&["p@example.com".to_string()])
            .await
            .unwrap();
    }

    assert!(storage.get_session_by_title("Dropped").await.unwrap().is_none());
    assert_eq!(storage.count_users_with_email("p@example.com").await, 0);
}

#[tokio::test]
async fn test_committed_transaction_is_visible() {
    let storage = MemoryStorageBackend::new();
    let owner = storage.create_user(new_user("O", "o@example.com")).await.unwrap();

    let mut tx = storage.begin().await.unwrap();
    let session = tx.create_session(new_session("Kept", owner.id)).await.unwrap();
    let users = tx
        .create_placeholder_users(&["b@example.com".to_string(), "a@example.com".to_string()])
        .await
        .unwrap();
    tx.create_session_collaborators(session.id, &[users[0].id, users[1].id])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(users[0].email, "b@example.com");
    assert_eq!(users[1].email, "a@example.com");
    let views = storage.list_session_collaborators(session.id).await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].email, "b@example.com");
    assert!(storage.is_session_visible(session.id, users[1].id).await.unwrap());
}

#[tokio::test]
async fn test_writes_reject_missing_references() {
    let storage = MemoryStorageBackend::new();

    let mut tx = storage.begin().await.unwrap();
    assert!(matches!(
        tx.create_session(new_session("Orphan", 99)).await,
        Err(StorageError::QueryError(_))
    ));
    assert!(matches!(
        tx.create_session_collaborators(7, &[1]).await,
        Err(StorageError::QueryError(_))
    ));
    drop(tx);

    let err = storage
        .create_session_attachments(
            7,
            ATTACHMENT_CATEGORY_ADD_FILES,
            &[AttachmentFile {
                name: "a.png".to_string(),
                url: "http://x/a.png".to_string(),
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::QueryError(_)));
}

#[tokio::test]
async fn test_email_lookup_prefers_registered_account() {
    let storage = MemoryStorageBackend::new();
    let mut tx = storage.begin().await.unwrap();
    tx.create_placeholder_users(&["dup@example.com".to_string()])
        .await
        .unwrap();
    tx.commit().await.unwrap();
    let registered = storage.create_user(new_user("Dup", "dup@example.com")).await.unwrap();

    let found = storage.get_user_by_email("dup@example.com").await.unwrap().unwrap();

    assert_eq!(found.id, registered.id);
    assert!(storage.get_user_by_email("DUP@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_social_upsert_refreshes_existing_user() {
    let storage = MemoryStorageBackend::new();
    let existing = storage.create_user(new_user("Old", "s@example.com")).await.unwrap();

    let user = storage
        .upsert_social_user(&SocialProfile {
            name: "New".to_string(),
            email: "s@example.com".to_string(),
            avatar: Some("https://img/s.png".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(user.id, existing.id);
    assert_eq!(user.name.as_deref(), Some("New"));
    assert_eq!(user.avatar.as_deref(), Some("https://img/s.png"));
    assert_eq!(user.password_hash.as_deref(), Some("hash"));
}

#[tokio::test]
async fn test_attachments_filtered_by_category_in_order() {
    let storage = MemoryStorageBackend::new();
    let owner = storage.create_user(new_user("O", "o@example.com")).await.unwrap();
    let mut tx = storage.begin().await.unwrap();
    let session = tx.create_session(new_session("Files", owner.id)).await.unwrap();
    tx.commit().await.unwrap();

    let file = |name: &str| AttachmentFile {
        name: name.to_string(),
        url: format!("http://x/{name}"),
    };
    storage
        .create_session_attachments(
            session.id,
            ATTACHMENT_CATEGORY_ADD_FILES,
            &[file("1.png"), file("2.png")],
        )
        .await
        .unwrap();
    storage
        .create_session_attachments(session.id, "other", &[file("3.png")])
        .await
        .unwrap();

    let listed = storage
        .list_session_attachments(session.id, ATTACHMENT_CATEGORY_ADD_FILES)
        .await
        .unwrap();
    let names: Vec<&str> = listed.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["1.png", "2.png"]);
}

#[tokio::test]
async fn test_primary_workspace_count() {
    let storage = MemoryStorageBackend::new();
    let owner = storage.create_user(new_user("O", "o@example.com")).await.unwrap();

    let mut tx = storage.begin().await.unwrap();
    let ws = tx
        .create_workspace(NewWorkspace {
            name: "W".to_string(),
            role: "r".to_string(),
            avatar: "http://x/w.png".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(tx.count_primary_workspaces(owner.id).await.unwrap(), 0);
    tx.create_workspace_user(ws.id, owner.id, true, true).await.unwrap();
    assert_eq!(tx.count_primary_workspaces(owner.id).await.unwrap(), 1);
    tx.commit().await.unwrap();

    assert_eq!(storage.get_workspace_by_name("W").await.unwrap().unwrap().id, ws.id);
    assert!(storage.get_workspace_by_name("w").await.unwrap().is_none());
}
