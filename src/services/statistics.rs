// src/services/statistics.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqliteConnection};

use crate::error::AppError;

/// Outcome of one graded exam, as fed to the statistics sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopicPerformance {
    pub topic_id: i64,
    pub user_id: i64,
    pub total_questions: i64,
    pub correct: i64,
    pub duration_minutes: i64,
}

/// Consumer of graded exams.
///
/// Called on the submission's own connection, inside its transaction: an error
/// here rolls the whole submission back.
#[async_trait]
pub trait StatisticsSink: Send + Sync {
    async fn record_topic_performance(
        &self,
        conn: &mut SqliteConnection,
        performance: &TopicPerformance,
    ) -> Result<(), AppError>;
}

/// Per-(topic, user) aggregates stored in `topic_statistics`.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct TopicStatistic {
    pub total_questions: i64,
    pub correct_answers: i64,
    pub score_percent: f64,
    pub exams_taken: i64,
    pub avg_seconds_per_question: f64,
}

impl TopicStatistic {
    /// Folds one more exam into the aggregate.
    pub fn accumulate(&self, performance: &TopicPerformance) -> TopicStatistic {
        let total_questions = self.total_questions + performance.total_questions;
        let correct_answers = self.correct_answers + performance.correct;

        if total_questions == 0 {
            return TopicStatistic {
                exams_taken: self.exams_taken + 1,
                ..self.clone()
            };
        }

        let score_percent = round2(correct_answers as f64 / total_questions as f64 * 100.0);

        // Time-weighted average across every question answered so far.
        let previous_seconds = self.avg_seconds_per_question * self.total_questions as f64;
        let new_seconds = (performance.duration_minutes * 60) as f64;
        let avg_seconds_per_question =
            round2((previous_seconds + new_seconds) / total_questions as f64);

        TopicStatistic {
            total_questions,
            correct_answers,
            score_percent,
            exams_taken: self.exams_taken + 1,
            avg_seconds_per_question,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Default sink backed by the `topic_statistics` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlTopicStatistics;

#[async_trait]
impl StatisticsSink for SqlTopicStatistics {
    async fn record_topic_performance(
        &self,
        conn: &mut SqliteConnection,
        performance: &TopicPerformance,
    ) -> Result<(), AppError> {
        let current = sqlx::query_as::<_, TopicStatistic>(
            "SELECT total_questions, correct_answers, score_percent, exams_taken, avg_seconds_per_question
             FROM topic_statistics
             WHERE topic_id = ? AND user_id = ?",
        )
        .bind(performance.topic_id)
        .bind(performance.user_id)
        .fetch_optional(&mut *conn)
        .await?
        .unwrap_or_default();

        let updated = current.accumulate(performance);

        sqlx::query(
            "INSERT INTO topic_statistics
                (topic_id, user_id, total_questions, correct_answers, score_percent,
                 exams_taken, avg_seconds_per_question, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(topic_id, user_id) DO UPDATE SET
                total_questions = excluded.total_questions,
                correct_answers = excluded.correct_answers,
                score_percent = excluded.score_percent,
                exams_taken = excluded.exams_taken,
                avg_seconds_per_question = excluded.avg_seconds_per_question,
                updated_at = excluded.updated_at",
        )
        .bind(performance.topic_id)
        .bind(performance.user_id)
        .bind(updated.total_questions)
        .bind(updated.correct_answers)
        .bind(updated.score_percent)
        .bind(updated.exams_taken)
        .bind(updated.avg_seconds_per_question)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to update statistics for topic {} user {}: {:?}",
                performance.topic_id,
                performance.user_id,
                e
            );
            AppError::from(e)
        })?;

        Ok(())
    }
}
