//! Workspace routes.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::{ApiError, ApiResponse, ApiResult, success};
use super::form::MultipartForm;
use super::validation::REQUIRED;
use crate::models::WorkspaceResponse;
use crate::services::FieldError;

pub fn workspace_router() -> Router<AppState> {
    Router::new().route("/", post(create_workspace))
}

/// POST /workspace - Create a workspace owned by the caller
///
/// The owner's membership becomes primary when they had none yet.
#[utoipa::path(
    post,
    path = "/workspace",
    tag = "Workspace",
    request_body(content = Multipart, description = "`name` and `role` fields plus an `avatar` file"),
    responses(
        (status = 200, description = "Workspace and owner membership", body = WorkspaceResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid token"),
        (status = 409, description = "Workspace with same name already exists"),
        (status = 502, description = "Object storage rejected the avatar")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_workspace(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<WorkspaceResponse>>> {
    let mut form = MultipartForm::read(multipart).await?;

    let mut errors = Vec::new();
    let name = form.required_text("name", &mut errors);
    let role = form.required_text("role", &mut errors);
    let avatar = form.take_files("avatar").into_iter().next();
    if avatar.is_none() {
        errors.push(FieldError::new("avatar", REQUIRED));
    }

    let (Some(name), Some(role), Some(avatar)) = (name, role, avatar) else {
        return Err(ApiError::validation(errors));
    };

    let workspace = state
        .workspaces
        .create_workspace(auth.user_id(), name, role, avatar)
        .await?;
    Ok(success(workspace, "Workspace created successfully"))
}
