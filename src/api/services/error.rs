//! Domain error taxonomy shared by the services.

use thiserror::Error;

use crate::storage::StorageError;

use super::object_storage::ObjectStorageError;

/// One rejected field of a request payload.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StorageError),
    #[error("external service failure: {0}")]
    ExternalService(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// A validation failure on a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<ObjectStorageError> for ServiceError {
    fn from(err: ObjectStorageError) -> Self {
        match err {
            ObjectStorageError::Staging(e) => ServiceError::Internal(e.to_string()),
            other => ServiceError::ExternalService(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
