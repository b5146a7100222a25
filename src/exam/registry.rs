// src/exam/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::config::FINISHED_ATTEMPT_RETENTION_SECS;
use crate::error::AppError;
use crate::exam::controller::{AttemptController, AttemptStatus, SubmissionJob};
use crate::exam::timer::Clock;
use crate::models::result::{NewResult, SubmitResponse};
use crate::store::ResultStore;

/// In-process registry of live attempts. Exactly one controller exists per
/// attempt id; the mutex serializes all engine access and is never held
/// across an await, so the engine itself stays lock-free and synchronous.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, AttemptController>>>,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// The clock shared with every controller this registry manages.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Registers a fresh attempt. Rejects a second live attempt for the same
    /// user and test: a finished one (submitted) does not count, but an
    /// unresolved `error` attempt does, since it still holds an unsaved
    /// result.
    pub fn register(&self, controller: AttemptController) -> Result<AttemptStatus, AppError> {
        let mut sessions = self.inner.lock().unwrap();

        let duplicate = sessions.values().any(|c| {
            c.user_id() == controller.user_id()
                && c.test_id() == controller.test_id()
                && !c.phase().is_terminal()
        });
        if duplicate {
            return Err(AppError::Conflict(
                "An attempt for this test is already in progress".to_string(),
            ));
        }

        let status = controller.status();
        sessions.insert(controller.attempt_id(), controller);
        Ok(status)
    }

    /// Runs `f` against the caller's attempt. 404 when the attempt does not
    /// exist (or was pruned), 403 when it belongs to someone else.
    pub fn with_attempt<R>(
        &self,
        attempt_id: Uuid,
        user_id: i64,
        f: impl FnOnce(&mut AttemptController) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut sessions = self.inner.lock().unwrap();
        let controller = sessions
            .get_mut(&attempt_id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        if controller.user_id() != user_id {
            return Err(AppError::Forbidden(
                "Attempt belongs to another user".to_string(),
            ));
        }
        f(controller)
    }

    /// Persists a sealed submission job: one automatic retry, then the
    /// attempt is parked in `error` with the job retained for manual retry.
    pub async fn finalize(
        &self,
        job: SubmissionJob,
        results: &dyn ResultStore,
    ) -> Result<SubmitResponse, AppError> {
        let record = NewResult {
            id: job.result_id,
            test_id: job.test_id,
            user_id: job.user_id,
            summary: job.summary.clone(),
        };

        let mut outcome = results.insert_result(&record).await;
        if let Err(e) = &outcome {
            tracing::warn!(
                "Attempt {}: result insert failed ({}), retrying once",
                job.attempt_id,
                e
            );
            outcome = results.insert_result(&record).await;
        }

        let mut sessions = self.inner.lock().unwrap();
        let controller = sessions.get_mut(&job.attempt_id);

        match outcome {
            Ok(result_id) => {
                if let Some(c) = controller {
                    c.mark_submitted(result_id);
                }
                Ok(SubmitResponse {
                    result_id,
                    summary: job.summary,
                })
            }
            Err(e) => {
                if let Some(c) = controller {
                    c.mark_failed();
                }
                Err(e)
            }
        }
    }

    /// One sweep of the 1-second ticker: advances every running timer,
    /// persists attempts whose countdown expired, and prunes finished
    /// sessions past the retention window.
    pub async fn tick_all(&self, results: &dyn ResultStore) {
        let now = self.clock.now();
        let retention = Duration::from_secs(FINISHED_ATTEMPT_RETENTION_SECS);

        let expired: Vec<SubmissionJob> = {
            let mut sessions = self.inner.lock().unwrap();

            sessions.retain(|_, c| match c.finished_at() {
                Some(finished) => now.duration_since(finished) < retention,
                None => true,
            });

            sessions.values_mut().filter_map(|c| c.tick()).collect()
        };

        for job in expired {
            let attempt_id = job.attempt_id;
            if let Err(e) = self.finalize(job, results).await {
                tracing::error!(
                    "Attempt {}: auto-submit after expiry failed: {}",
                    attempt_id,
                    e
                );
            }
        }
    }

    /// Number of live sessions, for diagnostics.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
