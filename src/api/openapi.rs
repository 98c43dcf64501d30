//! OpenAPI specification definition.
//!
//! Aggregates all route handlers and schemas for OpenAPI documentation generation.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::social_login,
        // User
        crate::routes::user::get_user,
        // Session
        crate::routes::session::list_sessions,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::list_session_files,
        crate::routes::session::add_session_files,
        // Workspace
        crate::routes::workspace::create_workspace,
        // OpenAPI
        crate::routes::openapi::serve_openapi_json,
    ),
    components(schemas(
        crate::routes::auth::RegisterPayload,
        crate::routes::auth::LoginPayload,
        crate::routes::auth::SocialLoginPayload,
        crate::routes::session::CreateSessionPayload,
        crate::services::TokenResponse,
        crate::services::FieldError,
        crate::models::UserResponse,
        crate::models::SessionResponse,
        crate::models::CollaboratorResponse,
        crate::models::SessionAttachment,
        crate::models::Workspace,
        crate::models::WorkspaceUser,
        crate::models::WorkspaceResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and social login"),
        (name = "User", description = "Authenticated user profile"),
        (name = "Session", description = "Critique sessions, collaborators and attachments"),
        (name = "Workspace", description = "Workspace creation"),
        (name = "OpenAPI", description = "OpenAPI specification"),
    ),
    info(
        title = "Critique Sessions API",
        description = "REST API for scheduling critique sessions, inviting collaborators and sharing files",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();

        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
