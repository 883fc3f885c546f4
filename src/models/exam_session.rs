// src/models/exam_session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::{MAX_DURATION_MINUTES, MAX_QUESTION_COUNT, MIN_DURATION_MINUTES, MIN_QUESTION_COUNT},
    models::question::ExamQuestion,
};

/// Lifecycle state of an exam session.
///
/// `PENDING -> STARTED -> {FINISHED | EXPIRED}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum ExamState {
    Pending,
    Started,
    Finished,
    Expired,
}

impl ExamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExamState::Finished | ExamState::Expired)
    }
}

/// Represents the 'exam_sessions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamSession {
    pub id: i64,
    pub title: String,
    pub topic_id: i64,
    pub user_id: i64,

    /// Number of questions requested at creation.
    pub total_questions: i64,
    pub duration_minutes: i64,

    /// Both `None` while the session is `PENDING`.
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,

    pub state: ExamState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExamSession {
    /// True when the session is `STARTED` and `now` lies beyond `deadline + grace`.
    pub fn is_overdue(&self, now: DateTime<Utc>, grace: chrono::Duration) -> bool {
        match (self.state, self.deadline) {
            (ExamState::Started, Some(deadline)) => now > deadline + grace,
            _ => false,
        }
    }
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(range(min = 1, message = "topic_id must be a positive id."))]
    pub topic_id: i64,
    #[validate(range(
        min = MIN_DURATION_MINUTES,
        max = MAX_DURATION_MINUTES,
        message = "Duration must be between 5 and 180 minutes."
    ))]
    pub duration_minutes: i64,
    #[validate(range(
        min = MIN_QUESTION_COUNT,
        max = MAX_QUESTION_COUNT,
        message = "Question count must be between 5 and 100."
    ))]
    pub question_count: i64,
}

/// DTO returned by start/continue: the session plus its questions in assignment order.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExamWithQuestions {
    #[serde(flatten)]
    pub exam: ExamSession,

    /// Questions actually drawn. Can be lower than `total_questions` when the bank is small.
    pub assigned_questions: usize,
    pub questions: Vec<ExamQuestion>,
}

/// DTO for the timing status of a session.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExamStatus {
    pub exam_id: i64,
    pub state: ExamState,

    /// Seconds left before the deadline. `None` unless the session is running.
    pub remaining_seconds: Option<i64>,

    pub total_seconds: i64,

    /// Share of the duration already used, clamped to [0, 100].
    pub percent_elapsed: i64,
}
