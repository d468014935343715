use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use classroom_core::{AppError, PageParams};

use crate::modules::subjects::model::{
    CreateSubjectDto, PaginatedSubjectsResponse, Subject, SubjectFilterParams, UpdateSubjectDto,
};

const SUBJECT_COLUMNS: &str = "id, code, name, description, created_at, updated_at";
const SEARCH_CLAUSE: &str = "($1::text IS NULL OR name ILIKE $1 OR code ILIKE $1)";

fn duplicate_code(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!("A subject with this code already exists"));
    }
    AppError::from(e)
}

fn subject_not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Subject not found"))
}

pub struct SubjectService;

impl SubjectService {
    #[instrument(skip(db))]
    pub async fn create_subject(db: &PgPool, dto: CreateSubjectDto) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(&format!(
            "INSERT INTO subjects (code, name, description)
             VALUES ($1, $2, $3)
             RETURNING {SUBJECT_COLUMNS}"
        ))
        .bind(dto.code.trim())
        .bind(dto.name.trim())
        .bind(&dto.description)
        .fetch_one(db)
        .await
        .map_err(duplicate_code)
    }

    #[instrument(skip(db))]
    pub async fn list_subjects(
        db: &PgPool,
        filters: SubjectFilterParams,
        page: PageParams,
    ) -> Result<PaginatedSubjectsResponse, AppError> {
        let pattern = filters.pattern();

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM subjects WHERE {SEARCH_CLAUSE}"))
                .bind(&pattern)
                .fetch_one(db)
                .await?;

        let data = sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects
             WHERE {SEARCH_CLAUSE}
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedSubjectsResponse {
            data,
            meta: page.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_subject(db: &PgPool, id: Uuid) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(subject_not_found)
    }

    #[instrument(skip(db))]
    pub async fn update_subject(
        db: &PgPool,
        id: Uuid,
        dto: UpdateSubjectDto,
    ) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(&format!(
            "UPDATE subjects
             SET code = COALESCE($2, code),
                 name = COALESCE($3, name),
                 description = COALESCE($4, description),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {SUBJECT_COLUMNS}"
        ))
        .bind(id)
        .bind(dto.code.as_deref().map(str::trim))
        .bind(dto.name.as_deref().map(str::trim))
        .bind(&dto.description)
        .fetch_optional(db)
        .await
        .map_err(duplicate_code)?
        .ok_or_else(subject_not_found)
    }

    #[instrument(skip(db))]
    pub async fn delete_subject(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(subject_not_found());
        }

        Ok(())
    }
}
