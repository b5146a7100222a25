// src/exam/controller.rs

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::exam::answers::AnswerSheet;
use crate::exam::proctor::{EnvironmentSignal, ProctorMonitor, ViolationKind};
use crate::exam::scoring::{MarkingScheme, score_attempt};
use crate::exam::timer::{AttemptTimer, Clock};
use crate::models::result::ResultSummary;
use crate::models::test::{AnswerValue, TestDefinition};

/// Lifecycle phase of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    NotStarted,
    AwaitingFullscreen,
    Running,
    Submitting,
    Submitted,
    Error,
}

impl AttemptPhase {
    /// Label for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::AwaitingFullscreen => "awaiting_fullscreen",
            Self::Running => "running",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// What pushed the attempt out of `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    TimerExpired,
    ViolationLimit,
}

/// Controller-level proctoring policy. The monitor classifies signals; these
/// knobs decide what the controller does about them.
#[derive(Debug, Clone, Copy)]
pub struct AttemptPolicy {
    /// Visibility-loss violations tolerated before forced submission.
    pub violation_limit: u32,

    /// When true, the first visibility loss submits immediately. Shipped
    /// disabled; the original had this wired but turned off.
    pub force_submit_on_hide: bool,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            violation_limit: crate::config::DEFAULT_VIOLATION_LIMIT,
            force_submit_on_hide: false,
        }
    }
}

/// A sealed submission: the scored summary plus everything the persistence
/// collaborator needs. Computed exactly once per attempt; persistence
/// retries reuse the same job, including the pre-assigned result id.
#[derive(Debug, Clone)]
pub struct SubmissionJob {
    pub attempt_id: Uuid,
    pub result_id: Uuid,
    pub test_id: i64,
    pub user_id: i64,
    pub trigger: SubmitTrigger,
    pub summary: ResultSummary,
}

/// Outcome of a manual submit call.
pub enum SubmitDisposition {
    /// Submission begins (or resumes after a failure); persist this job.
    Job(SubmissionJob),
    /// The attempt already went through; nothing to persist again.
    AlreadySubmitted {
        result_id: Uuid,
        summary: ResultSummary,
    },
}

/// Live status snapshot sent to the client.
#[derive(Debug, Serialize)]
pub struct AttemptStatus {
    pub attempt_id: Uuid,
    pub test_id: i64,
    pub phase: AttemptPhase,
    pub time_remaining_seconds: u64,
    pub violation_count: u32,
    /// True while a fullscreen exit is blocking interaction.
    pub locked: bool,
    pub answered_question_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<Uuid>,
}

/// Orchestrates one attempt: owns the phase machine, the answer sheet, the
/// timer and the proctoring state, and decides when submission is forced.
///
/// All methods are synchronous; the async persistence handoff lives in the
/// session registry. Every entry point checks the phase first, so callbacks
/// that arrive late (a tick after submission began, a stray event after
/// submit) fall through harmlessly.
pub struct AttemptController {
    attempt_id: Uuid,
    test: Arc<TestDefinition>,
    user_id: i64,
    phase: AttemptPhase,
    answers: AnswerSheet,
    timer: AttemptTimer,
    monitor: ProctorMonitor,
    violation_count: u32,
    policy: AttemptPolicy,
    scheme: Arc<dyn MarkingScheme>,
    clock: Arc<dyn Clock>,

    /// Sealed job, retained across persistence failures so a retry never
    /// rescores.
    pending: Option<SubmissionJob>,
    /// Set once persistence confirmed; makes further submits no-ops.
    stored_result_id: Option<Uuid>,
    finished_at: Option<Instant>,
}

impl AttemptController {
    pub fn new(
        attempt_id: Uuid,
        test: Arc<TestDefinition>,
        user_id: i64,
        policy: AttemptPolicy,
        scheme: Arc<dyn MarkingScheme>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timer = AttemptTimer::new(test.duration_seconds(), clock.clone());
        Self {
            attempt_id,
            test,
            user_id,
            phase: AttemptPhase::NotStarted,
            answers: AnswerSheet::new(),
            timer,
            monitor: ProctorMonitor::new(),
            violation_count: 0,
            policy,
            scheme,
            clock,
            pending: None,
            stored_result_id: None,
            finished_at: None,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn test_id(&self) -> i64 {
        self.test.id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    /// Interaction is locked while the attempt runs outside fullscreen.
    pub fn is_locked(&self) -> bool {
        self.phase == AttemptPhase::Running && !self.monitor.in_fullscreen()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining()
    }

    /// When the attempt reached its terminal phase, by the injected clock.
    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    pub fn status(&self) -> AttemptStatus {
        AttemptStatus {
            attempt_id: self.attempt_id,
            test_id: self.test.id,
            phase: self.phase,
            time_remaining_seconds: self.timer.remaining(),
            violation_count: self.violation_count,
            locked: self.is_locked(),
            answered_question_ids: self.answers.answered_ids(),
            result_id: self.stored_result_id,
        }
    }

    /// `not_started → awaiting_fullscreen`; called once the test definition
    /// has been fetched and the session is registered.
    pub fn begin(&mut self) -> Result<(), AppError> {
        if self.phase != AttemptPhase::NotStarted {
            return Err(AppError::Conflict("Attempt has already begun".to_string()));
        }
        self.phase = AttemptPhase::AwaitingFullscreen;
        Ok(())
    }

    /// Confirms fullscreen entry. The first confirmation starts the timer
    /// (`awaiting_fullscreen → running`); later ones clear a fullscreen-exit
    /// lock. Re-entering fullscreen never resets the countdown.
    pub fn confirm_fullscreen(&mut self) -> Result<(), AppError> {
        match self.phase {
            AttemptPhase::AwaitingFullscreen => {
                self.monitor.observe(EnvironmentSignal::FullscreenEntered);
                self.timer.start();
                self.phase = AttemptPhase::Running;
                tracing::info!(
                    "Attempt {} entered fullscreen, timer started ({}s)",
                    self.attempt_id,
                    self.timer.remaining()
                );
                Ok(())
            }
            AttemptPhase::Running => {
                self.monitor.observe(EnvironmentSignal::FullscreenEntered);
                Ok(())
            }
            _ => Err(AppError::Conflict(format!(
                "Attempt is {}, fullscreen confirmation not applicable",
                self.phase.label()
            ))),
        }
    }

    /// Records a selection. Returns Ok(false) when the answer sheet dropped
    /// the value (shape mismatch) — by contract that is not an error.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<bool, AppError> {
        self.ensure_interactive()?;
        let question = self
            .test
            .question(question_id)
            .ok_or_else(|| AppError::NotFound(format!("Question '{}' not found", question_id)))?
            .clone();
        Ok(self.answers.select(&question, value))
    }

    /// Clears a selection, marking the question unattempted.
    pub fn clear_answer(&mut self, question_id: &str) -> Result<(), AppError> {
        self.ensure_interactive()?;
        if self.test.question(question_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Question '{}' not found",
                question_id
            )));
        }
        self.answers.clear(question_id);
        Ok(())
    }

    fn ensure_interactive(&self) -> Result<(), AppError> {
        if self.phase != AttemptPhase::Running {
            return Err(AppError::Conflict(format!(
                "Attempt is {}, answers are closed",
                self.phase.label()
            )));
        }
        if self.is_locked() {
            return Err(AppError::Conflict(
                "Re-enter fullscreen to continue the attempt".to_string(),
            ));
        }
        Ok(())
    }

    /// Feeds one environment signal through the proctoring policy. Returns a
    /// submission job when the violation threshold forces the attempt out of
    /// `running`. Signals arriving in any other phase are stale callbacks
    /// and are ignored.
    pub fn handle_signal(&mut self, signal: EnvironmentSignal) -> Option<SubmissionJob> {
        match self.phase {
            AttemptPhase::AwaitingFullscreen => {
                if signal == EnvironmentSignal::FullscreenEntered {
                    // Equivalent to an explicit confirmation.
                    let _ = self.confirm_fullscreen();
                }
                None
            }
            AttemptPhase::Running => {
                let violation = self.monitor.observe(signal)?;
                match violation.kind {
                    ViolationKind::VisibilityLoss => {
                        self.violation_count += 1;
                        tracing::warn!(
                            "Attempt {}: {} (violation {}/{})",
                            self.attempt_id,
                            violation.message,
                            self.violation_count,
                            self.policy.violation_limit
                        );
                        if self.policy.force_submit_on_hide
                            || self.violation_count >= self.policy.violation_limit
                        {
                            return Some(self.begin_submission(SubmitTrigger::ViolationLimit));
                        }
                        None
                    }
                    ViolationKind::FullscreenExit => {
                        // Blocking: interaction stays suspended until the
                        // student re-enters fullscreen. The timer keeps
                        // running and expiry still submits.
                        tracing::warn!(
                            "Attempt {}: {}; interaction locked",
                            self.attempt_id,
                            violation.message
                        );
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// One timer observation. Returns a submission job when the countdown
    /// reached zero. Ticks outside `running` are ignored.
    pub fn tick(&mut self) -> Option<SubmissionJob> {
        if self.phase != AttemptPhase::Running {
            return None;
        }
        if self.timer.tick() {
            tracing::info!("Attempt {} expired, forcing submission", self.attempt_id);
            return Some(self.begin_submission(SubmitTrigger::TimerExpired));
        }
        None
    }

    /// Explicit submit. Idempotent once submitted; from the `error` phase it
    /// re-enters `submitting` with the already-sealed job.
    pub fn submit(&mut self) -> Result<SubmitDisposition, AppError> {
        match self.phase {
            AttemptPhase::Running => Ok(SubmitDisposition::Job(
                self.begin_submission(SubmitTrigger::Manual),
            )),
            AttemptPhase::Error => {
                let job = self
                    .pending
                    .clone()
                    .ok_or_else(|| {
                        AppError::InternalServerError(
                            "Attempt in error phase without a sealed submission".to_string(),
                        )
                    })?;
                self.phase = AttemptPhase::Submitting;
                tracing::info!("Attempt {} retrying submission", self.attempt_id);
                Ok(SubmitDisposition::Job(job))
            }
            AttemptPhase::Submitted => {
                let job = self.pending.as_ref().ok_or_else(|| {
                    AppError::InternalServerError(
                        "Submitted attempt lost its result summary".to_string(),
                    )
                })?;
                Ok(SubmitDisposition::AlreadySubmitted {
                    result_id: self.stored_result_id.unwrap_or(job.result_id),
                    summary: job.summary.clone(),
                })
            }
            AttemptPhase::Submitting => Err(AppError::Conflict(
                "Submission already in progress".to_string(),
            )),
            AttemptPhase::NotStarted | AttemptPhase::AwaitingFullscreen => Err(AppError::Conflict(
                "Attempt has not started yet".to_string(),
            )),
        }
    }

    /// `running → submitting`: seals the answer sheet, freezes the timer,
    /// scores the snapshot and stores the job for the persistence step.
    fn begin_submission(&mut self, trigger: SubmitTrigger) -> SubmissionJob {
        self.answers.seal();
        self.timer.stop();

        let snapshot = self.answers.snapshot();
        let summary = score_attempt(
            &self.test,
            &snapshot,
            self.timer.time_taken(),
            self.scheme.as_ref(),
        );

        self.phase = AttemptPhase::Submitting;
        let job = SubmissionJob {
            attempt_id: self.attempt_id,
            result_id: Uuid::new_v4(),
            test_id: self.test.id,
            user_id: self.user_id,
            trigger,
            summary,
        };
        tracing::info!(
            "Attempt {} submitting (trigger: {:?}, score: {})",
            self.attempt_id,
            trigger,
            job.summary.score
        );
        self.pending = Some(job.clone());
        job
    }

    /// `submitting → submitted`: persistence confirmed.
    pub fn mark_submitted(&mut self, result_id: Uuid) {
        if self.phase != AttemptPhase::Submitting {
            tracing::warn!(
                "Attempt {} confirmed while {}, ignoring",
                self.attempt_id,
                self.phase.label()
            );
            return;
        }
        self.phase = AttemptPhase::Submitted;
        self.stored_result_id = Some(result_id);
        self.finished_at = Some(self.clock.now());
        tracing::info!("Attempt {} submitted as result {}", self.attempt_id, result_id);
    }

    /// `submitting → error`: persistence failed after retries. The sealed
    /// job survives so a manual submit can retry without rescoring.
    pub fn mark_failed(&mut self) {
        if self.phase != AttemptPhase::Submitting {
            return;
        }
        self.phase = AttemptPhase::Error;
        tracing::error!(
            "Attempt {} submission failed; result retained for retry",
            self.attempt_id
        );
    }
}
