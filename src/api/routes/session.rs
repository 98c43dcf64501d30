//! Critique session routes.
//!
//! Every route requires a bearer token and only exposes sessions the caller
//! created or collaborates on; other sessions answer 404.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;
use validator::Validate;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::{ApiError, ApiResponse, ApiResult, success};
use super::form::MultipartForm;
use super::validation::{ValidatedJson, not_blank};
use crate::models::{SessionAttachment, SessionResponse};
use crate::services::CreateSessionInput;

const BAD_SESSION_ID: &str = "Failed to parse sessionId";

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSessionPayload {
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank")
    )]
    pub objective: Option<String>,
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank")
    )]
    pub stage: Option<String>,
    /// Scheduled date and time; stored as sent
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank")
    )]
    pub datetime: Option<String>,
    /// Minutes
    #[validate(
        required(message = "This field is required."),
        range(min = 1, message = "Value must be at least 1.")
    )]
    pub duration: Option<i32>,
    /// Comma separated collaborator emails
    pub collaborators: Option<String>,
}

impl From<CreateSessionPayload> for CreateSessionInput {
    fn from(payload: CreateSessionPayload) -> Self {
        let text = |v: Option<String>| v.unwrap_or_default().trim().to_string();
        Self {
            title: text(payload.title),
            objective: text(payload.objective),
            stage: text(payload.stage),
            datetime: text(payload.datetime),
            duration: payload.duration.unwrap_or_default(),
            collaborators: payload.collaborators,
        }
    }
}

pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/files", post(add_session_files))
        .route("/{id}", get(get_session))
        .route("/{id}/files", get(list_session_files))
}

fn parse_session_id(raw: &str) -> ApiResult<i64> {
    raw.trim().parse::<i64>().map_err(|e| {
        debug!("Bad session id {:?}: {}", raw, e);
        ApiError::bad_request(BAD_SESSION_ID)
    })
}

/// GET /session - Sessions visible to the caller
#[utoipa::path(
    get,
    path = "/session",
    tag = "Session",
    responses(
        (status = 200, description = "Visible sessions, newest first", body = [SessionResponse]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<SessionResponse>>>> {
    let sessions = state.sessions.list_sessions(auth.user_id()).await?;
    Ok(success(sessions, "Session fetched successfully"))
}

/// POST /session - Create a session and invite collaborators
#[utoipa::path(
    post,
    path = "/session",
    tag = "Session",
    request_body = CreateSessionPayload,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid token"),
        (status = 409, description = "Session with same title already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_session(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(payload): ValidatedJson<CreateSessionPayload>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    let session = state
        .sessions
        .create_session(auth.user_id(), payload.into())
        .await?;
    Ok(success(session, "Session created successfully"))
}

/// GET /session/{id} - Session detail with collaborators
#[utoipa::path(
    get,
    path = "/session/{id}",
    tag = "Session",
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session detail", body = SessionResponse),
        (status = 400, description = "Malformed session id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    let session_id = parse_session_id(&id)?;
    let session = state.sessions.get_session(session_id, auth.user_id()).await?;
    Ok(success(session, "Session data fetched successfully"))
}

/// GET /session/{id}/files - Files attached to a session
#[utoipa::path(
    get,
    path = "/session/{id}/files",
    tag = "Session",
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Attachments", body = [SessionAttachment]),
        (status = 400, description = "Malformed session id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_session_files(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<SessionAttachment>>>> {
    let session_id = parse_session_id(&id)?;
    let files = state
        .sessions
        .list_session_files(session_id, auth.user_id())
        .await?;
    Ok(success(files, "Session files fetched successfully"))
}

/// POST /session/files - Upload `images` and attach them to `session_id`
#[utoipa::path(
    post,
    path = "/session/files",
    tag = "Session",
    request_body(content = Multipart, description = "`session_id` field and one or more `images` files"),
    responses(
        (status = 200, description = "Full attachment list after the upload", body = [SessionAttachment]),
        (status = 400, description = "Missing or malformed session id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Session not found"),
        (status = 502, description = "Object storage rejected the upload")
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_session_files(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<ApiResponse<Vec<SessionAttachment>>>> {
    let mut form = MultipartForm::read(multipart).await?;

    let mut errors = Vec::new();
    let raw_id = form.required_text("session_id", &mut errors);
    let Some(raw_id) = raw_id else {
        return Err(ApiError::validation(errors));
    };
    let session_id = parse_session_id(&raw_id)?;

    let images = form.take_files("images");
    let files = state
        .sessions
        .add_session_files(session_id, auth.user_id(), images)
        .await?;
    Ok(success(files, "Session files added successfully"))
}
