// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Represents the 'topics' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub topic_id: i64,

    /// The text content of the question.
    pub text: String,

    /// Explanation shown once the exam is graded.
    pub explanation: Option<String>,

    /// Difficulty level: 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    /// Inactive questions are never drawn into new exams.
    pub active: bool,

    /// Answer choices, loaded separately from 'answer_options'.
    #[sqlx(skip)]
    pub options: Vec<AnswerOption>,
}

/// Represents the 'answer_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// DTO for an answer choice sent to an exam taker (excludes correctness).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

/// DTO for a question as presented inside an exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: i64,

    /// 1-based presentation position, fixed when the exam starts.
    pub ordinal: i64,

    pub text: String,
    pub difficulty: String,
    pub options: Vec<PublicOption>,

    /// Option chosen in a previously saved attempt, if any.
    pub selected_option_id: Option<i64>,
}

impl ExamQuestion {
    pub fn from_question(question: Question, ordinal: i64) -> Self {
        Self {
            id: question.id,
            ordinal,
            text: question.text,
            difficulty: question.difficulty,
            options: question
                .options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
            selected_option_id: None,
        }
    }
}
