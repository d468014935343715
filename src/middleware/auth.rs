use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use classroom_auth::{Claims, verify_token};
use classroom_core::{AppError, Role};

use crate::metrics::track_jwt_validation;
use crate::state::AppState;

/// The authenticated caller, placed in request extensions by
/// [`resolve_identity`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.0.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn subject(&self) -> &str {
        &self.0.sub
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Marks a request whose bearer token failed verification.
#[derive(Debug, Clone)]
pub struct RejectedCredential(pub String);

/// Resolves the caller's identity from a bearer token.
///
/// A verified token places [`AuthUser`] in the request extensions. A token
/// that fails verification is only marked with [`RejectedCredential`], so the
/// pre-auth gate still screens and charges the request as a guest before
/// [`reject_invalid_credential`] answers it with 401.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()).map(str::to_owned) else {
        return next.run(req).await;
    };

    match verify_token(&token, &state.jwt_config) {
        Ok(claims) => {
            track_jwt_validation(true);
            req.extensions_mut().insert(AuthUser(claims));
        }
        Err(err) => {
            track_jwt_validation(false);
            debug!("Rejected bearer token");
            req.extensions_mut()
                .insert(RejectedCredential(err.public_message()));
        }
    }

    next.run(req).await
}

/// Answers requests marked by [`resolve_identity`] with 401.
pub async fn reject_invalid_credential(req: Request, next: Next) -> Result<Response, AppError> {
    if let Some(RejectedCredential(message)) = req.extensions().get::<RejectedCredential>() {
        return Err(AppError::unauthorized(message.clone()));
    }
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))
    }
}

/// Declares an extractor that admits only callers whose role satisfies
/// `$allowed`, a `fn(&Role) -> bool`.
#[macro_export]
macro_rules! require_role {
    ($name:ident, $allowed:expr, $label:literal) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::middleware::auth::AuthUser);

        impl<S> axum::extract::FromRequestParts<S> for $name
        where
            S: Send + Sync,
        {
            type Rejection = classroom_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &S,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    $crate::middleware::auth::AuthUser::from_request_parts(parts, state).await?;

                if !($allowed)(&auth_user.role()) {
                    return Err(classroom_core::AppError::forbidden(format!(
                        "Access denied. Requires {} role",
                        $label
                    )));
                }

                Ok($name(auth_user))
            }
        }
    };
}

require_role!(RequireStaff, Role::is_staff, "teacher or admin");
require_role!(RequireAdmin, Role::is_admin, "admin");
