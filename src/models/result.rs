// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

use crate::models::test::AnswerValue;

/// Per-question record inside a result: what was selected (if anything) and
/// whether it was correct. One entry exists for every question of the test,
/// attempted or not, so the review screen can walk the full paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<AnswerValue>,
    pub is_correct: bool,
}

/// Output of the scoring engine. Immutable once computed; the controller
/// holds it across persistence retries so a failed submit never rescores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub score: f64,
    /// correct / total, 0.0 for an empty test.
    pub accuracy: f64,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub unattempted: u32,
    pub attempt_data: Vec<QuestionOutcome>,
    pub time_taken_seconds: u64,
}

/// Represents the 'results' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub test_id: i64,
    pub user_id: i64,
    pub score: f64,
    pub accuracy: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub unattempted: i32,
    pub time_taken_seconds: i64,

    /// Full per-question breakdown, stored as a JSON array column.
    pub attempt_data: Json<Vec<QuestionOutcome>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Insert payload for the results store. The id is assigned when the attempt
/// is sealed so retries write the same row.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub id: Uuid,
    pub test_id: i64,
    pub user_id: i64,
    pub summary: ResultSummary,
}

/// Summary row for listing a user's past results without the breakdown.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultListEntry {
    pub id: Uuid,
    pub test_id: i64,
    pub score: f64,
    pub accuracy: f64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for manual submission of an attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub attempt_id: Uuid,
}

/// DTO returned once an attempt has been submitted and persisted.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub result_id: Uuid,
    pub summary: ResultSummary,
}
