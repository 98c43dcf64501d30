// Models module - contains User, Session, collaborator, attachment and workspace rows

pub mod session;
pub mod user;
pub mod workspace;

pub use session::{
    ATTACHMENT_CATEGORY_ADD_FILES, AttachmentFile, CollaboratorResponse, CollaboratorView,
    NewSession, Session, SessionAttachment, SessionCollaborator, SessionResponse,
};
pub use user::{NewUser, SocialProfile, User, UserResponse};
pub use workspace::{NewWorkspace, Workspace, WorkspaceResponse, WorkspaceUser};
