//! API error handling utilities.
//!
//! Every failure leaves the API as either the `{status, data, message}`
//! envelope or, for payload validation, `{errors: [{field, message}]}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use crate::services::{FieldError, ServiceError};
use crate::storage::StorageError;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: T,
    pub message: String,
}

pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status: "success",
        data,
        message: message.into(),
    })
}

/// API error response
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError(ServiceError::Persistence(err))
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError(ServiceError::BadRequest(message.into()))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError(ServiceError::Auth(message.into()))
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        ApiError(ServiceError::Validation(errors))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) | ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Persistence(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

fn envelope(status: StatusCode, message: String) -> Response {
    let body = json!({
        "status": "error",
        "data": null,
        "message": message,
    });

    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.0 {
            ServiceError::Validation(mut errors) => {
                errors.sort_by(|a, b| a.field.cmp(&b.field));
                (status, Json(json!({ "errors": errors }))).into_response()
            }
            ServiceError::Persistence(e) => {
                error!("Storage failure: {}", e);
                envelope(status, "Internal server error".to_string())
            }
            ServiceError::Internal(e) => {
                error!("Internal failure: {}", e);
                envelope(status, "Internal server error".to_string())
            }
            ServiceError::ExternalService(e) => {
                warn!("Upstream failure: {}", e);
                envelope(status, "Upstream service failed".to_string())
            }
            ServiceError::BadRequest(m)
            | ServiceError::Auth(m)
            | ServiceError::NotFound(m)
            | ServiceError::Conflict(m)
            | ServiceError::RateLimited(m) => envelope(status, m),
        }
    }
}
