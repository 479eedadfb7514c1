use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::controllers::{auth, sessions};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        auth::refresh,
        auth::forgot_password,
        auth::reset_password,
        auth::verify_email,
        auth::resend_verification,
        sessions::list_sessions,
        sessions::revoke_session,
        sessions::revoke_other_sessions,
        sessions::logout_all_sessions,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::RefreshRequest,
        auth::ForgotPasswordRequest,
        auth::ResetPasswordRequest,
        auth::VerifyEmailRequest,
        auth::UserDto,
        auth::AuthPayload,
        auth::TokenPairDto,
        sessions::RevokeSessionRequest,
        sessions::RevokeOthersRequest,
        sessions::SessionDto,
        sessions::RevokedCountDto,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication and token lifecycle"),
        (name = "sessions", description = "Multi-device session management"),
    ),
    info(
        title = "doorman",
        description = "Standalone authentication and session lifecycle service",
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

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
            );
        }
    }
}
