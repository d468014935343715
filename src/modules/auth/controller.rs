use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use classroom_core::AppError;

use crate::docs::ErrorResponse;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{AuthResponse, SessionResponse, SignInRequest, SignOutResponse, SignUpRequest};
use super::service::AuthService;

/// Create an account with email and password
#[utoipa::path(
    post,
    path = "/api/auth/sign-up/email",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Malformed body or email already registered", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn sign_up_email(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let response = AuthService::sign_up(&state.db, &state.jwt_config, dto).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/sign-in/email",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn sign_in_email(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<SignInRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = AuthService::sign_in(&state.db, &state.jwt_config, dto).await?;
    Ok(Json(response))
}

/// Current session for the bearer token
#[utoipa::path(
    get,
    path = "/api/auth/get-session",
    responses(
        (status = 200, description = "Active session", body = SessionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user), fields(user = %auth_user.subject()))]
pub async fn get_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<SessionResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    let session = AuthService::get_session(&state.db, user_id, &auth_user.0).await?;
    Ok(Json(session))
}

/// Sign out. Tokens are stateless, so the client discards its token.
#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    responses(
        (status = 200, description = "Signed out", body = SignOutResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip(auth_user), fields(user = %auth_user.subject()))]
pub async fn sign_out(auth_user: AuthUser) -> Json<SignOutResponse> {
    Json(SignOutResponse { success: true })
}
