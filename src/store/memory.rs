// src/store/memory.rs

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::result::{ExamResult, NewResult, ResultListEntry};
use crate::models::test::{TestDefinition, TestListEntry};
use crate::models::user::{SyncUserRequest, User};
use crate::store::{ResultStore, TestStore, UserStore};

/// In-memory store: backs the integration tests and local development
/// without a database. Mirrors the Postgres implementation's observable
/// behavior, including idempotent result inserts, and adds failure
/// injection for exercising the submission retry path.
#[derive(Default)]
pub struct MemoryStore {
    tests: Mutex<HashMap<i64, TestDefinition>>,
    results: Mutex<Vec<ExamResult>>,
    users: Mutex<Vec<User>>,
    next_user_id: AtomicI64,
    failing_inserts: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_user_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    pub fn seed_test(&self, test: TestDefinition) {
        self.tests.lock().unwrap().insert(test.id, test);
    }

    /// Makes the next `n` result inserts fail, to drive the retry path.
    pub fn fail_next_inserts(&self, n: u32) {
        self.failing_inserts.store(n, Ordering::SeqCst);
    }

    pub fn result_count(&self) -> usize {
        self.results.lock().unwrap().len()
    }
}

#[async_trait]
impl TestStore for MemoryStore {
    async fn fetch_test(&self, test_id: i64) -> Result<Option<TestDefinition>, AppError> {
        Ok(self.tests.lock().unwrap().get(&test_id).cloned())
    }

    async fn list_tests(&self) -> Result<Vec<TestListEntry>, AppError> {
        let tests = self.tests.lock().unwrap();
        let mut entries: Vec<TestListEntry> = tests
            .values()
            .map(|t| TestListEntry {
                id: t.id,
                title: t.title.clone(),
                category: t.category.clone(),
                duration_minutes: t.duration_minutes,
                total_marks: t.total_marks,
                question_count: t.questions.0.len() as i32,
            })
            .collect();
        entries.sort_by_key(|t| t.id);
        Ok(entries)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn insert_result(&self, result: &NewResult) -> Result<Uuid, AppError> {
        let failing = self.failing_inserts.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_inserts.store(failing - 1, Ordering::SeqCst);
            return Err(AppError::InternalServerError(
                "Injected result store failure".to_string(),
            ));
        }

        let mut results = self.results.lock().unwrap();
        if results.iter().any(|r| r.id == result.id) {
            return Ok(result.id);
        }

        let summary = &result.summary;
        results.push(ExamResult {
            id: result.id,
            test_id: result.test_id,
            user_id: result.user_id,
            score: summary.score,
            accuracy: summary.accuracy,
            total_questions: summary.total_questions as i32,
            correct_answers: summary.correct_answers as i32,
            wrong_answers: summary.wrong_answers as i32,
            unattempted: summary.unattempted as i32,
            time_taken_seconds: summary.time_taken_seconds as i64,
            attempt_data: Json(summary.attempt_data.clone()),
            created_at: Some(Utc::now()),
        });
        Ok(result.id)
    }

    async fn fetch_result(&self, id: Uuid) -> Result<Option<ExamResult>, AppError> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        test_id: Option<i64>,
    ) -> Result<Vec<ResultListEntry>, AppError> {
        let results = self.results.lock().unwrap();
        let mut entries: Vec<ResultListEntry> = results
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| test_id.is_none_or(|t| r.test_id == t))
            .map(|r| ResultListEntry {
                id: r.id,
                test_id: r.test_id,
                score: r.score,
                accuracy: r.accuracy,
                total_questions: r.total_questions,
                correct_answers: r.correct_answers,
                created_at: r.created_at,
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn count_for_user(&self, test_id: i64, user_id: i64) -> Result<i64, AppError> {
        Ok(self
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.test_id == test_id && r.user_id == user_id)
            .count() as i64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn sync_user(&self, req: &SyncUserRequest) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();

        if let Some(user) = users.iter_mut().find(|u| u.firebase_uid == req.firebase_uid) {
            user.name = req.name.clone();
            user.email = req.email.clone();
            return Ok(user.clone());
        }

        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            name: req.name.clone(),
            email: req.email.clone(),
            firebase_uid: req.firebase_uid.clone(),
            role: req.role.clone().unwrap_or_else(|| "student".to_string()),
            created_at: Some(Utc::now()),
        };
        users.push(user.clone());
        Ok(user)
    }
}
