//! Session creation, visibility, collaborators and attachments.

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use common::{create_session, register, spawn_app};
use serde_json::{Value, json};

fn image(name: &str, bytes: &'static [u8]) -> Part {
    Part::bytes(bytes).file_name(name).mime_type("image/png")
}

#[tokio::test]
async fn test_create_session_links_collaborators_in_order() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    register(&app.server, "Bea", "bea@example.com").await;

    let session = create_session(
        &app.server,
        &owner,
        "Checkout redesign",
        Some(" new@example.com, bea@example.com ,new@example.com,, "),
    )
    .await;

    assert_eq!(session["title"], "Checkout redesign");
    assert_eq!(session["duration"], 45);
    assert_eq!(session["status"], false);
    let collaborators = session["collaborators"].as_array().unwrap();
    let emails: Vec<&str> = collaborators
        .iter()
        .map(|c| c["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["new@example.com", "bea@example.com"]);
    assert_eq!(collaborators[0]["name"], Value::Null);
    assert_eq!(collaborators[1]["name"], "Bea");
    assert_eq!(collaborators[0]["status"], false);

    assert_eq!(app.storage.count_users_with_email("new@example.com").await, 1);
    assert_eq!(app.storage.count_users_with_email("bea@example.com").await, 1);
}

#[tokio::test]
async fn test_create_session_without_collaborators() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;

    let session = create_session(&app.server, &owner, "Solo", None).await;

    assert_eq!(session["collaborators"], json!([]));
    let id = session["id"].as_i64().unwrap();
    assert_eq!(app.storage.count_session_links(id).await, 0);
}

#[tokio::test]
async fn test_create_session_validation() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;

    let response = app
        .server
        .post("/session")
        .authorization_bearer(&owner)
        .json(&json!({ "title": "  ", "objective": "x", "duration": 0 }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let fields: Vec<String> = response.json::<Value>()["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["datetime", "duration", "stage", "title"]);
}

#[tokio::test]
async fn test_duplicate_title_conflicts() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    create_session(&app.server, &owner, "Weekly crit", None).await;

    let response = app
        .server
        .post("/session")
        .authorization_bearer(&owner)
        .json(&json!({
            "title": "Weekly crit",
            "objective": "again",
            "stage": "final",
            "datetime": "2024-05-02T10:00:00Z",
            "duration": 30,
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(
        response.json::<Value>()["message"],
        "Session with same title already exists"
    );
}

#[tokio::test]
async fn test_list_sessions_shows_created_and_collaborating_once() {
    let app = spawn_app();
    let ada = register(&app.server, "Ada", "ada@example.com").await;
    let bob = register(&app.server, "Bob", "bob@example.com").await;
    let eve = register(&app.server, "Eve", "eve@example.com").await;

    create_session(&app.server, &ada, "Ada only", None).await;
    create_session(
        &app.server,
        &bob,
        "Bob with Ada",
        Some("ada@example.com, eve@example.com"),
    )
    .await;
    create_session(&app.server, &ada, "Ada with Bob", Some("bob@example.com")).await;

    let titles = |body: Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["title"].as_str().unwrap().to_string())
            .collect()
    };

    let listed: Value = app.server.get("/session").authorization_bearer(&ada).await.json();
    assert_eq!(listed["message"], "Session fetched successfully");
    assert_eq!(titles(listed), vec!["Ada with Bob", "Bob with Ada", "Ada only"]);

    let listed: Value = app.server.get("/session").authorization_bearer(&eve).await.json();
    assert_eq!(titles(listed.clone()), vec!["Bob with Ada"]);
    assert_eq!(
        listed["data"][0]["collaborators"].as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_creator_listed_as_collaborator_sees_session_once() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    let profile: Value = app.server.get("/user").authorization_bearer(&owner).await.json();
    let owner_id = profile["data"]["id"].as_i64().unwrap();

    let session = create_session(
        &app.server,
        &owner,
        "Self review",
        Some("owner@example.com, owner@example.com"),
    )
    .await;

    let collaborators = session["collaborators"].as_array().unwrap();
    assert_eq!(collaborators.len(), 1);
    assert_eq!(collaborators[0]["user_id"], owner_id);
    assert_eq!(session["created_by"], owner_id);

    let listed: Value = app.server.get("/session").authorization_bearer(&owner).await.json();
    let sessions = listed["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["title"], "Self review");
    assert_eq!(sessions[0]["collaborators"][0]["user_id"], owner_id);
}

#[tokio::test]
async fn test_get_session_visibility() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    let guest = register(&app.server, "Guest", "guest@example.com").await;
    let stranger = register(&app.server, "Stranger", "stranger@example.com").await;

    let session = create_session(&app.server, &owner, "Private", Some("guest@example.com")).await;
    let path = format!("/session/{}", session["id"]);

    let as_owner = app.server.get(&path).authorization_bearer(&owner).await;
    assert_eq!(as_owner.status_code(), StatusCode::OK);
    let body: Value = as_owner.json();
    assert_eq!(body["message"], "Session data fetched successfully");
    assert_eq!(body["data"]["collaborators"][0]["email"], "guest@example.com");

    let as_guest = app.server.get(&path).authorization_bearer(&guest).await;
    assert_eq!(as_guest.status_code(), StatusCode::OK);

    let as_stranger = app.server.get(&path).authorization_bearer(&stranger).await;
    assert_eq!(as_stranger.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(as_stranger.json::<Value>()["message"], "Session not found");

    let missing = app.server.get("/session/9999").authorization_bearer(&owner).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_session_id() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;

    for path in ["/session/abc", "/session/abc/files"] {
        let response = app.server.get(path).authorization_bearer(&owner).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["message"],
            "Failed to parse sessionId"
        );
    }
}

#[tokio::test]
async fn test_collaborator_of_deleted_user_is_dropped() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    let session = create_session(
        &app.server,
        &owner,
        "Cleanup",
        Some("gone@example.com,kept@example.com"),
    )
    .await;
    let gone_id = session["collaborators"][0]["user_id"].as_i64().unwrap();
    assert!(app.storage.remove_user(gone_id).await);

    let body: Value = app
        .server
        .get(&format!("/session/{}", session["id"]))
        .authorization_bearer(&owner)
        .await
        .json();

    let collaborators = body["data"]["collaborators"].as_array().unwrap();
    assert_eq!(collaborators.len(), 1);
    assert_eq!(collaborators[0]["email"], "kept@example.com");
}

#[tokio::test]
async fn test_upload_and_list_session_files() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    let guest = register(&app.server, "Guest", "guest@example.com").await;
    let session = create_session(&app.server, &owner, "Moodboard", Some("guest@example.com")).await;
    let id = session["id"].as_i64().unwrap();

    let form = MultipartForm::new()
        .add_text("session_id", id.to_string())
        .add_part("images", image("Hero Shot.PNG", b"first"))
        .add_part("images", image("detail.png", b"second"));
    let response = app
        .server
        .post("/session/files")
        .authorization_bearer(&guest)
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "Session files added successfully");
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["category"], "add-files");
    assert_eq!(files[0]["session_id"], id);

    let name = files[0]["name"].as_str().unwrap();
    assert!(name.starts_with("hero-shot-"), "unexpected name {name}");
    assert!(name.ends_with(".png"));
    assert_eq!(
        files[0]["url"],
        format!("http://files.test/uploads/{name}")
    );
    assert_eq!(
        std::fs::read(app.upload_dir().join(name)).unwrap(),
        b"first"
    );

    let served = app.server.get(&format!("/uploads/{name}")).await;
    assert_eq!(served.status_code(), StatusCode::OK);
    assert_eq!(served.as_bytes().as_ref(), b"first");

    let listed = app
        .server
        .get(&format!("/session/{id}/files"))
        .authorization_bearer(&owner)
        .await;
    assert_eq!(listed.status_code(), StatusCode::OK);
    let listed: Value = listed.json();
    assert_eq!(listed["message"], "Session files fetched successfully");
    assert_eq!(listed["data"], body["data"]);
}

#[tokio::test]
async fn test_upload_requires_session_id_and_visibility() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    let stranger = register(&app.server, "Stranger", "stranger@example.com").await;
    let session = create_session(&app.server, &owner, "Closed", None).await;

    let missing_id = app
        .server
        .post("/session/files")
        .authorization_bearer(&owner)
        .multipart(MultipartForm::new().add_part("images", image("a.png", b"a")))
        .await;
    assert_eq!(missing_id.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        missing_id.json::<Value>(),
        json!({ "errors": [{ "field": "session_id", "message": "This field is required." }] })
    );

    let bad_id = app
        .server
        .post("/session/files")
        .authorization_bearer(&owner)
        .multipart(MultipartForm::new().add_text("session_id", "x1"))
        .await;
    assert_eq!(bad_id.status_code(), StatusCode::BAD_REQUEST);

    let hidden = app
        .server
        .post("/session/files")
        .authorization_bearer(&stranger)
        .multipart(
            MultipartForm::new()
                .add_text("session_id", session["id"].to_string())
                .add_part("images", image("a.png", b"a")),
        )
        .await;
    assert_eq!(hidden.status_code(), StatusCode::NOT_FOUND);
    assert!(std::fs::read_dir(app.upload_dir()).is_err());
}

#[tokio::test]
async fn test_session_routes_require_auth() {
    let app = spawn_app();

    for response in [
        app.server.get("/session").await,
        app.server.get("/session/1").await,
        app.server.get("/session/1/files").await,
        app.server.post("/session").json(&json!({})).await,
    ] {
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
}
