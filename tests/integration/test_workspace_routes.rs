//! Workspace creation.

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use common::{register, spawn_app};
use serde_json::{Value, json};

fn workspace_form(name: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("name", name)
        .add_text("role", "Design lead")
        .add_part(
            "avatar",
            Part::bytes(&b"avatar-bytes"[..])
                .file_name("Logo.JPG")
                .mime_type("image/jpeg"),
        )
}

#[tokio::test]
async fn test_first_workspace_is_primary() {
    let app = spawn_app();
    let token = register(&app.server, "Ada", "ada@example.com").await;

    let response = app
        .server
        .post("/workspace")
        .authorization_bearer(&token)
        .multipart(workspace_form("Studio"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "Workspace created successfully");
    let data = &body["data"];
    assert_eq!(data["name"], "Studio");
    assert_eq!(data["role"], "Design lead");
    assert_eq!(data["membership"]["user_id"], 1);
    assert_eq!(data["membership"]["workspace_id"], data["id"]);
    assert_eq!(data["membership"]["is_owner"], true);
    assert_eq!(data["membership"]["is_primary"], true);

    let avatar = data["avatar"].as_str().unwrap();
    let key = avatar
        .strip_prefix("http://files.test/uploads/")
        .expect("avatar served from local uploads");
    assert!(key.ends_with(".jpg"));
    assert_eq!(
        std::fs::read(app.upload_dir().join(key)).unwrap(),
        b"avatar-bytes"
    );
}

#[tokio::test]
async fn test_second_workspace_is_not_primary() {
    let app = spawn_app();
    let token = register(&app.server, "Ada", "ada@example.com").await;
    let other = register(&app.server, "Bob", "bob@example.com").await;

    for name in ["First", "Second"] {
        app.server
            .post("/workspace")
            .authorization_bearer(&token)
            .multipart(workspace_form(name))
            .await
            .assert_status_ok();
    }

    let third: Value = app
        .server
        .post("/workspace")
        .authorization_bearer(&token)
        .multipart(workspace_form("Third"))
        .await
        .json();
    assert_eq!(third["data"]["membership"]["is_primary"], false);

    // Primary is tracked per user
    let bobs: Value = app
        .server
        .post("/workspace")
        .authorization_bearer(&other)
        .multipart(workspace_form("Bob's"))
        .await
        .json();
    assert_eq!(bobs["data"]["membership"]["is_primary"], true);
}

#[tokio::test]
async fn test_duplicate_workspace_name_conflicts() {
    let app = spawn_app();
    let token = register(&app.server, "Ada", "ada@example.com").await;
    app.server
        .post("/workspace")
        .authorization_bearer(&token)
        .multipart(workspace_form("Studio"))
        .await
        .assert_status_ok();

    let response = app
        .server
        .post("/workspace")
        .authorization_bearer(&token)
        .multipart(workspace_form("Studio"))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(
        response.json::<Value>()["message"],
        "Workspace with same name already exists"
    );
}

#[tokio::test]
async fn test_workspace_form_validation() {
    let app = spawn_app();
    let token = register(&app.server, "Ada", "ada@example.com").await;

    let response = app
        .server
        .post("/workspace")
        .authorization_bearer(&token)
        .multipart(MultipartForm::new().add_text("name", "Studio").add_text("role", " "))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "errors": [
                { "field": "avatar", "message": "This field is required." },
                { "field": "role", "message": "This field is required." },
            ]
        })
    );
}

#[tokio::test]
async fn test_workspace_requires_auth() {
    let app = spawn_app();

    let response = app
        .server
        .post("/workspace")
        .multipart(workspace_form("Studio"))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}
