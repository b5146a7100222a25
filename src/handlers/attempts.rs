// src/handlers/attempts.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    exam::controller::{
        AttemptController, AttemptPolicy, AttemptStatus, SubmitDisposition,
    },
    exam::proctor::EnvironmentSignal,
    exam::registry::SessionRegistry,
    exam::scoring::ExactMatchMarking,
    models::result::{SubmitAttemptRequest, SubmitResponse},
    models::test::AnswerValue,
    state::Stores,
    utils::jwt::Claims,
};

/// DTO for recording one answer.
#[derive(Debug, Deserialize)]
pub struct RecordAnswerRequest {
    pub question_id: String,
    pub value: AnswerValue,
}

/// DTO for a reported environment signal.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub signal: EnvironmentSignal,
}

/// Response to an environment signal: the attempt's new status, plus the
/// stored result when the signal tipped the attempt into auto-submission.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SubmitResponse>,
}

/// Creates an attempt session for a test.
///
/// Fetches the definition, enforces `max_attempts` against the persisted
/// result count, and registers the controller in `awaiting_fullscreen`.
/// The timer does not start until fullscreen is confirmed.
pub async fn start_attempt(
    State(stores): State<Stores>,
    State(sessions): State<SessionRegistry>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let test = stores
        .tests
        .fetch_test(test_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test {} not found", test_id)))?;

    let completed = stores.results.count_for_user(test_id, user_id).await?;
    if test.attempts_exhausted(completed) {
        return Err(AppError::Conflict(
            "Maximum attempts for this test reached".to_string(),
        ));
    }

    let policy = AttemptPolicy {
        violation_limit: config.violation_limit,
        force_submit_on_hide: config.force_submit_on_hide,
    };

    let mut controller = AttemptController::new(
        Uuid::new_v4(),
        Arc::new(test),
        user_id,
        policy,
        Arc::new(ExactMatchMarking),
        sessions.clock(),
    );
    controller.begin()?;

    let status = sessions.register(controller)?;
    tracing::info!(
        "User {} started attempt {} on test {}",
        user_id,
        status.attempt_id,
        test_id
    );

    Ok((StatusCode::CREATED, Json(status)))
}

/// Live status of an attempt.
pub async fn get_attempt(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let status =
        sessions.with_attempt(attempt_id, claims.user_id(), |c| Ok(c.status()))?;
    Ok(Json(status))
}

/// Confirms fullscreen entry: starts the timer on the first confirmation,
/// clears a fullscreen-exit lock on later ones.
pub async fn confirm_fullscreen(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let status = sessions.with_attempt(attempt_id, claims.user_id(), |c| {
        c.confirm_fullscreen()?;
        Ok(c.status())
    })?;
    Ok(Json(status))
}

/// Records a selection. `accepted: false` means the value shape did not fit
/// the question type and was dropped — by contract not an error.
pub async fn record_answer(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(payload): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let accepted = sessions.with_attempt(attempt_id, claims.user_id(), |c| {
        c.record_answer(&payload.question_id, payload.value)
    })?;
    Ok(Json(serde_json::json!({ "accepted": accepted })))
}

/// Clears a selection, marking the question unattempted.
pub async fn clear_answer(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path((attempt_id, question_id)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    sessions.with_attempt(attempt_id, claims.user_id(), |c| {
        c.clear_answer(&question_id)
    })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Feeds a proctoring signal into the attempt.
///
/// When the violation policy forces submission, the result is persisted
/// before responding and returned inline. A persistence failure parks the
/// attempt in `error` (visible in the returned status); the student's
/// explicit submit retries it.
pub async fn report_event(
    State(stores): State<Stores>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(payload): Json<EventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let job =
        sessions.with_attempt(attempt_id, user_id, |c| Ok(c.handle_signal(payload.signal)))?;

    let result = match job {
        Some(job) => match sessions.finalize(job, stores.results.as_ref()).await {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::error!(
                    "Attempt {}: forced submission could not be stored: {}",
                    attempt_id,
                    e
                );
                None
            }
        },
        None => None,
    };

    let status = sessions.with_attempt(attempt_id, user_id, |c| Ok(c.status()))?;
    Ok(Json(EventResponse { status, result }))
}

/// Manual submission of the caller's attempt on this test.
///
/// Idempotent: once the attempt is submitted, the stored result id is
/// returned again without touching the store. From the `error` phase this
/// retries persistence with the already-sealed summary.
pub async fn submit_attempt(
    State(stores): State<Stores>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let disposition = sessions.with_attempt(payload.attempt_id, claims.user_id(), |c| {
        if c.test_id() != test_id {
            return Err(AppError::BadRequest(
                "Attempt does not belong to this test".to_string(),
            ));
        }
        c.submit()
    })?;

    match disposition {
        SubmitDisposition::Job(job) => {
            let response = sessions.finalize(job, stores.results.as_ref()).await?;
            Ok(Json(response))
        }
        SubmitDisposition::AlreadySubmitted { result_id, summary } => {
            Ok(Json(SubmitResponse { result_id, summary }))
        }
    }
}
