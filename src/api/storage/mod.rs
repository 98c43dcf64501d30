//! Storage module for the API.
//!
//! Provides storage backends for PostgreSQL and process memory.

pub mod error;
pub mod traits;

// Storage backend implementations
pub mod memory;
pub mod postgres;

pub use error::StorageError;
pub use memory::MemoryStorageBackend;
pub use postgres::PostgresStorageBackend;
pub use traits::{StorageBackend, StorageTransaction};
