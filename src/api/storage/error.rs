//! Storage error types for the API storage backends.

use thiserror::Error;

/// Storage operation errors.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {entity_id}")]
    NotFound {
        entity_type: String,
        entity_id: String,
    },
    /// Database connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
    /// A query or write was rejected by the database
    #[error("Query error: {0}")]
    QueryError(String),
    /// General storage error
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::ConnectionError(err.to_string())
            }
            other => StorageError::QueryError(other.to_string()),
        }
    }
}
