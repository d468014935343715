use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use classroom_core::{PageMeta, PageParams, Role};

use crate::middleware::admission::Refusal;
use crate::modules::auth::model::{
    AuthResponse, SessionResponse, SignInRequest, SignOutResponse, SignUpRequest, User,
};
use crate::modules::subjects::model::{
    CreateSubjectDto, PaginatedSubjectsResponse, Subject, UpdateSubjectDto,
};
use crate::modules::welcome::WelcomeResponse;

/// Body of every application error.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::welcome::welcome,
        crate::modules::auth::controller::sign_up_email,
        crate::modules::auth::controller::sign_in_email,
        crate::modules::auth::controller::get_session,
        crate::modules::auth::controller::sign_out,
        crate::modules::subjects::controller::list_subjects,
        crate::modules::subjects::controller::get_subject,
        crate::modules::subjects::controller::create_subject,
        crate::modules::subjects::controller::update_subject,
        crate::modules::subjects::controller::delete_subject,
    ),
    components(
        schemas(
            Role,
            User,
            SignUpRequest,
            SignInRequest,
            AuthResponse,
            SessionResponse,
            SignOutResponse,
            Subject,
            CreateSubjectDto,
            UpdateSubjectDto,
            PaginatedSubjectsResponse,
            PageMeta,
            PageParams,
            WelcomeResponse,
            ErrorResponse,
            Refusal,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Authentication", description = "Email and password sessions"),
        (name = "Subjects", description = "Subject catalogue")
    ),
    info(
        title = "Classroom API",
        version = "0.1.0",
        description = "Classroom backend with JWT authentication and per-role request admission. Requests refused by an admission gate receive a `Refusal` body with status 403, 429 or 500.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
