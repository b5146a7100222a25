// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::result::{ExamResult, NewResult, ResultListEntry};
use crate::models::test::{TestDefinition, TestListEntry};
use crate::models::user::{SyncUserRequest, User};
use crate::store::{ResultStore, TestStore, UserStore};

/// Production store backed by Postgres. Queries are runtime-checked; the
/// nested question and breakdown documents live in JSONB columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TestStore for PgStore {
    async fn fetch_test(&self, test_id: i64) -> Result<Option<TestDefinition>, AppError> {
        let test = sqlx::query_as::<_, TestDefinition>(
            r#"
            SELECT id, title, duration_minutes, total_marks, category,
                   instructions, questions, max_attempts, created_at
            FROM tests
            WHERE id = $1
            "#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch test {}: {:?}", test_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(test)
    }

    async fn list_tests(&self) -> Result<Vec<TestListEntry>, AppError> {
        let tests = sqlx::query_as::<_, TestListEntry>(
            r#"
            SELECT id, title, category, duration_minutes, total_marks,
                   jsonb_array_length(questions) AS question_count
            FROM tests
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list tests: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(tests)
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn insert_result(&self, result: &NewResult) -> Result<Uuid, AppError> {
        let summary = &result.summary;

        // ON CONFLICT DO NOTHING keeps the retry path idempotent: if the
        // first insert actually landed before the connection dropped, the
        // second one is a no-op on the same id.
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO results
                (id, test_id, user_id, score, accuracy, total_questions,
                 correct_answers, wrong_answers, unattempted,
                 time_taken_seconds, attempt_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(result.id)
        .bind(result.test_id)
        .bind(result.user_id)
        .bind(summary.score)
        .bind(summary.accuracy)
        .bind(summary.total_questions as i32)
        .bind(summary.correct_answers as i32)
        .bind(summary.wrong_answers as i32)
        .bind(summary.unattempted as i32)
        .bind(summary.time_taken_seconds as i64)
        .bind(Json(summary.attempt_data.clone()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert result {}: {:?}", result.id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(inserted.unwrap_or(result.id))
    }

    async fn fetch_result(&self, id: Uuid) -> Result<Option<ExamResult>, AppError> {
        let result = sqlx::query_as::<_, ExamResult>(
            r#"
            SELECT id, test_id, user_id, score, accuracy, total_questions,
                   correct_answers, wrong_answers, unattempted,
                   time_taken_seconds, attempt_data, created_at
            FROM results
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch result {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(result)
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        test_id: Option<i64>,
    ) -> Result<Vec<ResultListEntry>, AppError> {
        // QueryBuilder for the optional filter.
        let mut query_builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "SELECT id, test_id, score, accuracy, total_questions, correct_answers, created_at \
             FROM results WHERE user_id = ",
        );
        query_builder.push_bind(user_id);
        if let Some(test_id) = test_id {
            query_builder.push(" AND test_id = ");
            query_builder.push_bind(test_id);
        }
        query_builder.push(" ORDER BY created_at DESC");

        let results = query_builder
            .build_query_as::<ResultListEntry>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list results for user {}: {:?}", user_id, e);
                AppError::InternalServerError(e.to_string())
            })?;

        Ok(results)
    }

    async fn count_for_user(&self, test_id: i64, user_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM results WHERE test_id = $1 AND user_id = $2",
        )
        .bind(test_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count results: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(count)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn sync_user(&self, req: &SyncUserRequest) -> Result<User, AppError> {
        let role = req.role.as_deref().unwrap_or("student");

        // Upsert keyed on the external identity. Name and email track the
        // provider; the role is never updated through sync so a crafted
        // payload cannot escalate an existing account.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, firebase_uid, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (firebase_uid) DO UPDATE SET
                name = EXCLUDED.name,
                email = EXCLUDED.email
            RETURNING id, name, email, firebase_uid, role, created_at
            "#,
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.firebase_uid)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to sync user {}: {:?}", req.firebase_uid, e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(user)
    }
}
