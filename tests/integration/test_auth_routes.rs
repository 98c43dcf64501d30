//! Registration, login, social login and bearer authentication.

#[path = "../common/mod.rs"]
mod common;

use axum::body::Bytes;
use axum::http::StatusCode;
use common::{PASSWORD, StubGoogle, register, spawn_app, spawn_app_with, token_of};
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_returns_usable_token() {
    let app = spawn_app();

    let response = app
        .server
        .post("/auth/register")
        .json(&json!({ "name": "Ada", "email": "ada@example.com", "password": PASSWORD }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "User registration successful.");
    let token = token_of(&body);

    let profile = app.server.get("/user").authorization_bearer(&token).await;
    assert_eq!(profile.status_code(), StatusCode::OK);
    let profile: Value = profile.json();
    assert_eq!(profile["message"], "User data fetched successfully");
    assert_eq!(profile["data"]["name"], "Ada");
    assert_eq!(profile["data"]["email"], "ada@example.com");
    assert!(profile["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = spawn_app();

    let response = app
        .server
        .post("/auth/register")
        .json(&json!({ "email": "not-an-email", "password": "short" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "errors": [
                { "field": "email", "message": "Invalid email format." },
                { "field": "name", "message": "This field is required." },
                { "field": "password", "message": "Value is too short. Minimum 8 characters are required." },
            ]
        })
    );
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = spawn_app();
    register(&app.server, "Ada", "ada@example.com").await;

    let response = app
        .server
        .post("/auth/register")
        .json(&json!({ "name": "Other", "email": "ada@example.com", "password": PASSWORD }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["data"], Value::Null);
    assert_eq!(body["message"], "User with same email already exists");
}

#[tokio::test]
async fn test_register_claims_invited_placeholder() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    common::create_session(&app.server, &owner, "Homepage", Some("guest@example.com")).await;
    assert_eq!(app.storage.count_users_with_email("guest@example.com").await, 1);

    let guest = register(&app.server, "Guest", "guest@example.com").await;

    assert_eq!(app.storage.count_users_with_email("guest@example.com").await, 1);
    let sessions: Value = app
        .server
        .get("/session")
        .authorization_bearer(&guest)
        .await
        .json();
    assert_eq!(sessions["data"].as_array().unwrap().len(), 1);
    assert_eq!(sessions["data"][0]["title"], "Homepage");
    assert_eq!(sessions["data"][0]["collaborators"][0]["name"], "Guest");
}

#[tokio::test]
async fn test_login_success_and_failures() {
    let app = spawn_app();
    register(&app.server, "Ada", "ada@example.com").await;

    let ok = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(ok.status_code(), StatusCode::OK);
    let body: Value = ok.json();
    assert_eq!(body["message"], "User login successful.");
    assert!(!token_of(&body).is_empty());

    for (email, password) in [
        ("ada@example.com", "wrong-password"),
        ("nobody@example.com", PASSWORD),
    ] {
        let response = app
            .server
            .post("/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_placeholder_cannot_log_in() {
    let app = spawn_app();
    let owner = register(&app.server, "Owner", "owner@example.com").await;
    common::create_session(&app.server, &owner, "Homepage", Some("guest@example.com")).await;

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "guest@example.com", "password": PASSWORD }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = spawn_app();

    let response = app
        .server
        .post("/auth/login")
        .bytes(Bytes::from_static(b"{\"email\": "))
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_social_login_creates_then_refreshes_user() {
    let google = StubGoogle::default()
        .with_profile("token-1", "Grace", "grace@example.com")
        .with_profile("token-2", "Grace Hopper", "grace@example.com");
    let app = spawn_app_with(&[], google);

    let first = app
        .server
        .post("/auth/sociallogin")
        .json(&json!({ "token": "token-1", "provider": "google" }))
        .await;
    assert_eq!(first.status_code(), StatusCode::OK);

    let second = app
        .server
        .post("/auth/sociallogin")
        .json(&json!({ "token": "token-2", "provider": "google" }))
        .await;
    assert_eq!(second.status_code(), StatusCode::OK);
    let token = token_of(&second.json::<Value>());

    assert_eq!(app.storage.count_users_with_email("grace@example.com").await, 1);
    let profile: Value = app.server.get("/user").authorization_bearer(&token).await.json();
    assert_eq!(profile["data"]["name"], "Grace Hopper");
    assert_eq!(profile["data"]["avatar"], "https://example.com/token-2.png");
}

#[tokio::test]
async fn test_social_login_rejections() {
    let app = spawn_app_with(
        &[],
        StubGoogle::default().with_profile("good", "Grace", "grace@example.com"),
    );

    let unsupported = app
        .server
        .post("/auth/sociallogin")
        .json(&json!({ "token": "good", "provider": "github" }))
        .await;
    assert_eq!(unsupported.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        unsupported.json::<Value>()["message"],
        "Unsupported provider: github"
    );

    let rejected = app
        .server
        .post("/auth/sociallogin")
        .json(&json!({ "token": "expired", "provider": "google" }))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::BAD_GATEWAY);

    let missing = app
        .server
        .post("/auth/sociallogin")
        .json(&json!({ "provider": "google" }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        missing.json::<Value>()["errors"][0],
        json!({ "field": "token", "message": "This field is required." })
    );
}

#[tokio::test]
async fn test_bearer_auth_failures() {
    let app = spawn_app();

    let missing = app.server.get("/user").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        missing.json::<Value>()["message"],
        "Authorization header is missing"
    );

    let invalid = app.server.get("/user").authorization_bearer("garbage").await;
    assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(invalid.json::<Value>()["message"], "Invalid token");
}

#[tokio::test]
async fn test_token_for_deleted_user_is_rejected() {
    let app = spawn_app();
    let token = register(&app.server, "Ada", "ada@example.com").await;
    assert!(app.storage.remove_user(1).await);

    let response = app.server.get("/session").authorization_bearer(&token).await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["message"], "User not found");
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited() {
    let app = spawn_app_with(&[("AUTH_RATE_LIMIT_PER_MINUTE", "2")], StubGoogle::default());

    for _ in 0..2 {
        let response = app
            .server
            .post("/auth/login")
            .json(&json!({ "email": "ada@example.com", "password": PASSWORD }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    let limited = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        limited.json::<Value>()["message"],
        "Too many requests, try again later"
    );

    // Other routes share nothing with the auth quota
    let health = app.server.get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
}
