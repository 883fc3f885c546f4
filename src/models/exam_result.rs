// src/models/exam_result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'exam_questions' table: one row per assigned question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssignmentEntry {
    pub session_id: i64,
    pub question_id: i64,
    /// 1-based, strictly increasing within a session.
    pub ordinal: i64,
}

/// Represents the 'exam_results' table in the database.
///
/// A provisional row (`is_final = false`, `finished_at = None`) holds saved
/// progress while the session is running; submission finalizes it in place.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub session_id: i64,
    pub user_id: i64,
    pub total_questions: i64,
    pub correct_count: i64,

    /// Percentage of correct answers, rounded half-up to 2 decimals.
    pub score_percent: f64,

    /// `score_percent` rounded to whole points.
    pub score_total: i64,

    pub actual_duration_minutes: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub is_final: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'user_answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserAnswer {
    pub question_id: i64,
    /// `None` when the question was left blank.
    pub option_id: Option<i64>,
    pub is_correct: bool,
}

/// A single answer as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerInput {
    pub question_id: i64,
    pub option_id: Option<i64>,
}

/// DTO for submitting an exam. Must carry at least one answer.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<AnswerInput>,
}

/// DTO for saving progress. An empty list clears previously saved answers.
#[derive(Debug, Deserialize)]
pub struct SaveProgressRequest {
    pub answers: Vec<AnswerInput>,
}

/// DTO for a graded exam: the result plus every recorded answer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExamResultDetail {
    #[serde(flatten)]
    pub result: ExamResult,
    pub topic_id: i64,
    pub answers: Vec<UserAnswer>,
}

/// Acknowledgement of a partial save.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressSaved {
    pub exam_id: i64,
    pub saved_answers: usize,
    pub actual_duration_minutes: i64,
}
