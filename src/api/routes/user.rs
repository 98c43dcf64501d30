//! Current user profile.

use axum::{Json, Router, routing::get};

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::{ApiResponse, ApiResult, success};
use crate::models::UserResponse;

pub fn user_router() -> Router<AppState> {
    Router::new().route("/", get(get_user))
}

/// GET /user - Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/user",
    tag = "User",
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(auth: AuthContext) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    Ok(success(
        UserResponse::from(&auth.user),
        "User data fetched successfully",
    ))
}
