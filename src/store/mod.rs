// src/store/mod.rs
//
// Persistence collaborators behind trait seams. The attempt engine never
// talks to a database directly; handlers and the ticker go through these,
// which is what lets the integration tests run against the in-memory
// implementation.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::result::{ExamResult, NewResult, ResultListEntry};
use crate::models::test::{TestDefinition, TestListEntry};
use crate::models::user::{SyncUserRequest, User};

/// Read access to immutable test definitions.
#[async_trait]
pub trait TestStore: Send + Sync {
    async fn fetch_test(&self, test_id: i64) -> Result<Option<TestDefinition>, AppError>;

    async fn list_tests(&self) -> Result<Vec<TestListEntry>, AppError>;
}

/// Persistence for finished attempts.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Inserts a result. Idempotent on the pre-assigned id: re-inserting an
    /// already-stored result returns the existing id without a second row.
    async fn insert_result(&self, result: &NewResult) -> Result<Uuid, AppError>;

    async fn fetch_result(&self, id: Uuid) -> Result<Option<ExamResult>, AppError>;

    async fn list_for_user(
        &self,
        user_id: i64,
        test_id: Option<i64>,
    ) -> Result<Vec<ResultListEntry>, AppError>;

    /// Completed attempts a user has on record for a test, for enforcing
    /// `max_attempts`.
    async fn count_for_user(&self, test_id: i64, user_id: i64) -> Result<i64, AppError>;
}

/// Application user records, keyed by the external identity.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Upserts by `firebase_uid` and returns the application record. Name
    /// and email follow the identity provider; the role is set on first
    /// sync only.
    async fn sync_user(&self, req: &SyncUserRequest) -> Result<User, AppError>;
}
