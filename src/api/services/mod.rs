//! Services module - contains the business logic behind the route handlers.

pub mod auth_service;
pub mod collaborator_service;
pub mod error;
pub mod jwt_service;
pub mod oauth_service;
pub mod object_storage;
pub mod password_service;
pub mod session_service;
pub mod workspace_service;

// Re-export for convenience
pub use auth_service::AuthService;
pub use error::{FieldError, ServiceError, ServiceResult};
pub use jwt_service::{Claims, JwtService, SharedJwtService, TokenResponse};
pub use oauth_service::{GoogleOAuthService, SharedIdentityProvider, SocialIdentityProvider};
pub use object_storage::{
    FileObjectStorage, ObjectStorage, ObjectStorageError, S3ObjectStorage, SharedObjectStorage,
};
pub use password_service::PasswordService;
pub use session_service::{CreateSessionInput, SessionService, UploadedFile};
pub use workspace_service::WorkspaceService;
