//! API routes module - organizes all route handlers.

pub mod app_state;
pub mod auth;
pub mod auth_context;
pub mod error;
pub mod form;
pub mod openapi;
pub mod session;
pub mod user;
pub mod validation;
pub mod workspace;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use app_state::AppState;

use crate::middleware::create_cors_layer;

/// Build the full application: API routes, documentation, local uploads
/// (when no bucket is configured), fallback and the shared layers.
pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/auth", auth::auth_router(&state))
        .nest("/user", user::user_router())
        .nest("/session", session::session_router())
        .nest("/workspace", workspace::workspace_router())
        .merge(openapi::openapi_router());

    if config.s3.is_none() {
        router = router.nest_service("/uploads", ServeDir::new(&config.upload_dir));
    }

    router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&config.allowed_hosts)),
        )
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "critique-sessions-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": 404, "message": "Route Not Found" })),
    )
}
