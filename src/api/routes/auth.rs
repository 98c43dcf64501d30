//! Authentication routes: registration, login and social login.

use axum::{Json, Router, extract::State, middleware, routing::post};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::app_state::AppState;
use super::error::{ApiResponse, ApiResult, success};
use super::validation::{ValidatedJson, not_blank, password_length};
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::services::TokenResponse;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterPayload {
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank"),
        email(message = "Invalid email format.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "This field is required."),
        custom(function = "password_length")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank"),
        email(message = "Invalid email format.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "This field is required."),
        custom(function = "password_length")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SocialLoginPayload {
    /// Access token issued by the provider
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank")
    )]
    pub token: Option<String>,
    /// Currently only `google`
    #[validate(
        required(message = "This field is required."),
        custom(function = "not_blank")
    )]
    pub provider: Option<String>,
}

/// Create the auth router, guarded by the shared auth rate limiter
pub fn auth_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/sociallogin", post(social_login))
        .layer(middleware::from_fn_with_state(
            state.auth_rate_limiter.clone(),
            rate_limit_middleware,
        ))
}

/// POST /auth/register - Create an account and return a token
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterPayload,
    responses(
        (status = 200, description = "User registered; token in `data`", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "User with same email already exists"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterPayload>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let token = state
        .auth
        .register(
            payload.name.as_deref().unwrap_or_default().trim(),
            payload.email.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(success(TokenResponse { token }, "User registration successful."))
}

/// POST /auth/login - Exchange email and password for a token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login successful; token in `data`", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid email or password"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginPayload>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let token = state
        .auth
        .login(
            payload.email.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(success(TokenResponse { token }, "User login successful."))
}

/// POST /auth/sociallogin - Sign in with a social provider access token
#[utoipa::path(
    post,
    path = "/auth/sociallogin",
    tag = "Auth",
    request_body = SocialLoginPayload,
    responses(
        (status = 200, description = "Login successful; token in `data`", body = TokenResponse),
        (status = 400, description = "Validation failed or unsupported provider"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 502, description = "Provider rejected the token")
    )
)]
pub async fn social_login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SocialLoginPayload>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    let token = state
        .auth
        .social_login(
            payload.provider.as_deref().unwrap_or_default().trim(),
            payload.token.as_deref().unwrap_or_default().trim(),
        )
        .await?;

    Ok(success(TokenResponse { token }, "User login successful."))
}
