use chrono::DateTime;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use classroom_auth::{Claims, create_access_token};
use classroom_config::JwtConfig;
use classroom_core::{AppError, Role, hash_password, verify_password};

use crate::metrics::{
    track_jwt_issued, track_sign_in_failure, track_sign_in_success, track_user_signed_up,
};
use crate::modules::auth::model::{
    AuthResponse, SessionResponse, SignInRequest, SignUpRequest, User, UserRecord,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

pub struct AuthService;

impl AuthService {
    /// Role requested at sign-up. Only `student` and `teacher` may be picked.
    fn sign_up_role(requested: Option<&str>) -> Result<Role, AppError> {
        let Some(name) = requested.map(str::trim).filter(|name| !name.is_empty()) else {
            return Ok(Role::Student);
        };

        match name.parse::<Role>() {
            Ok(role) if role.is_self_assignable() => Ok(role),
            _ => Err(AppError::unprocessable(anyhow::anyhow!(
                "Role must be either student or teacher"
            ))),
        }
    }

    fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    fn issue(user: User, jwt_config: &JwtConfig) -> Result<AuthResponse, AppError> {
        let issued = create_access_token(user.id, &user.email, user.role, jwt_config)?;
        track_jwt_issued();
        Ok(AuthResponse {
            token: issued.token,
            user,
        })
    }

    #[instrument(skip(db, jwt_config, dto), fields(email = %dto.email))]
    pub async fn sign_up(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: SignUpRequest,
    ) -> Result<AuthResponse, AppError> {
        let role = Self::sign_up_role(dto.role.as_deref())?;
        let email = Self::normalize_email(&dto.email);
        let password_hash = hash_password(&dto.password)?;

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (name, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(dto.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::bad_request(anyhow::anyhow!(
                    "A user with this email already exists"
                ));
            }
            AppError::from(e)
        })?;

        track_user_signed_up(role.as_str());
        info!(user_id = %record.id, role = %role, "User signed up");

        Self::issue(User::from(record), jwt_config)
    }

    #[instrument(skip(db, jwt_config, dto), fields(email = %dto.email))]
    pub async fn sign_in(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: SignInRequest,
    ) -> Result<AuthResponse, AppError> {
        let email = Self::normalize_email(&dto.email);

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(&email)
        .fetch_optional(db)
        .await?;

        let Some(record) = record else {
            track_sign_in_failure("user_not_found");
            return Err(AppError::unauthorized("Invalid email or password"));
        };

        if !verify_password(&dto.password, &record.password_hash)? {
            track_sign_in_failure("invalid_password");
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        let user = User::from(record);
        track_sign_in_success(user.role.as_str());

        Self::issue(user, jwt_config)
    }

    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, user_id: Uuid) -> Result<Option<User>, AppError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;

        Ok(record.map(User::from))
    }

    /// The session behind a verified token. A token whose user no longer
    /// exists is treated as unauthenticated.
    #[instrument(skip(db, claims), fields(user_id = %user_id))]
    pub async fn get_session(
        db: &PgPool,
        user_id: Uuid,
        claims: &Claims,
    ) -> Result<SessionResponse, AppError> {
        let user = Self::get_user(db, user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

        let expires_at = DateTime::from_timestamp(claims.exp as i64, 0)
            .ok_or_else(|| AppError::unauthorized("Invalid token expiry"))?;

        Ok(SessionResponse { user, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_role_defaults_to_student() {
        assert_eq!(AuthService::sign_up_role(None).unwrap(), Role::Student);
        assert_eq!(AuthService::sign_up_role(Some("  ")).unwrap(), Role::Student);
    }

    #[test]
    fn test_sign_up_role_accepts_student_and_teacher() {
        assert_eq!(
            AuthService::sign_up_role(Some("teacher")).unwrap(),
            Role::Teacher
        );
        assert_eq!(
            AuthService::sign_up_role(Some("student")).unwrap(),
            Role::Student
        );
    }

    #[test]
    fn test_sign_up_role_rejects_admin_and_unknown() {
        for role in ["admin", "guest", "principal"] {
            let err = AuthService::sign_up_role(Some(role)).unwrap_err();
            assert_eq!(err.status, axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            AuthService::normalize_email("  Ada@School.IO "),
            "ada@school.io"
        );
    }
}
