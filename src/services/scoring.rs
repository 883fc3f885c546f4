// src/services/scoring.rs

//! Final submission: grade, persist and close a running session in one transaction.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    error::AppError,
    models::{
        exam_result::{AnswerInput, ExamResult, ExamResultDetail, UserAnswer},
        exam_session::ExamState,
    },
    services::{
        assignment_ledger,
        lifecycle::{ExamService, not_running},
        question_bank,
        result_store::{self, FinalScore},
        session_store,
        statistics::TopicPerformance,
    },
};

/// Percentage of correct answers, rounded half-up to two decimals.
///
/// Computed on integers (hundredths of a percent) so that values such as
/// 2/3 land on 66.67 without float drift.
pub fn score_percent(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let hundredths = (correct * 10_000 * 2 + total) / (2 * total);
    hundredths as f64 / 100.0
}

/// Whole minutes between `started_at` and `now`, floored.
pub fn elapsed_minutes(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - started_at).num_minutes().max(0)
}

/// Rejects a payload naming the same question twice.
pub(crate) fn ensure_unique_questions(answers: &[AnswerInput]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(answers.len());
    for answer in answers {
        if !seen.insert(answer.question_id) {
            return Err(AppError::ValidationError(format!(
                "Question {} is answered more than once",
                answer.question_id
            )));
        }
    }
    Ok(())
}

/// Resolves every answer against the session's assignment and the question bank.
///
/// Each returned row carries the correctness of the chosen option; a blank
/// answer is incorrect. Any answer naming a question outside the assignment,
/// or an option that does not belong to its question, rejects the whole batch.
pub(crate) async fn grade_answers(
    conn: &mut SqliteConnection,
    session_id: i64,
    answers: &[AnswerInput],
) -> Result<Vec<UserAnswer>, AppError> {
    let assigned: HashSet<i64> = assignment_ledger::assignment_order(&mut *conn, session_id)
        .await?
        .into_iter()
        .map(|entry| entry.question_id)
        .collect();

    let mut graded = Vec::with_capacity(answers.len());
    for answer in answers {
        if !assigned.contains(&answer.question_id) {
            return Err(AppError::InvalidAnswerReference(format!(
                "Question {} is not part of exam {}",
                answer.question_id, session_id
            )));
        }

        let is_correct = match answer.option_id {
            Some(option_id) => {
                question_bank::find_option_by_question_and_id(
                    &mut *conn,
                    answer.question_id,
                    option_id,
                )
                .await?
                .ok_or_else(|| {
                    AppError::InvalidAnswerReference(format!(
                        "Option {} not found for question {}",
                        option_id, answer.question_id
                    ))
                })?
                .is_correct
            }
            None => false,
        };

        graded.push(UserAnswer {
            question_id: answer.question_id,
            option_id: answer.option_id,
            is_correct,
        });
    }

    Ok(graded)
}

impl ExamService {
    /// `STARTED -> FINISHED`: grades `answers` and records the result.
    ///
    /// Accepted up to the deadline plus the grace window. Everything from the
    /// state flip to the statistics update commits or rolls back together, so a
    /// rejected submission leaves the session `STARTED` and its rows untouched.
    pub async fn submit(
        &self,
        session_id: i64,
        owner_id: i64,
        answers: &[AnswerInput],
    ) -> Result<ExamResultDetail, AppError> {
        let session = self.find_owned(session_id, owner_id).await?;
        if session.state != ExamState::Started {
            return Err(not_running(&session));
        }

        let now = Utc::now();
        if session.is_overdue(now, self.submit_grace) {
            self.expire(session, now).await?;
            return Err(AppError::SessionExpired(format!(
                "Time for exam {} has run out",
                session_id
            )));
        }

        if answers.is_empty() {
            return Err(AppError::ValidationError(
                "At least one answer must be submitted".to_string(),
            ));
        }
        ensure_unique_questions(answers)?;

        let started_at = session.started_at.ok_or_else(|| {
            AppError::InternalServerError(format!("Exam {} is running without a start time", session_id))
        })?;

        let mut tx = self.pool.begin().await?;

        // Claim the session before anything else: of two racing submissions only
        // one gets past this conditional update.
        if !session_store::mark_finished(&mut *tx, session_id, owner_id, now).await? {
            return Err(AppError::InvalidTransition(format!(
                "Exam {} is no longer in progress",
                session_id
            )));
        }

        let graded = grade_answers(&mut tx, session_id, answers).await?;

        let total_questions = graded.len() as i64;
        let correct_count = graded.iter().filter(|a| a.is_correct).count() as i64;
        let percent = score_percent(correct_count, total_questions);
        let score = FinalScore {
            total_questions,
            correct_count,
            score_percent: percent,
            score_total: percent.round() as i64,
            actual_duration_minutes: elapsed_minutes(started_at, now),
        };

        let result_id =
            result_store::save_final(&mut *tx, session_id, owner_id, started_at, &score, now)
                .await?;
        result_store::replace_answers(&mut tx, result_id, &graded, now).await?;

        self.statistics
            .record_topic_performance(
                &mut tx,
                &TopicPerformance {
                    topic_id: session.topic_id,
                    user_id: owner_id,
                    total_questions,
                    correct: correct_count,
                    duration_minutes: score.actual_duration_minutes,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Exam {} submitted by user {}: {}/{} correct ({}%)",
            session_id,
            owner_id,
            correct_count,
            total_questions,
            percent
        );

        self.get_result(session_id, owner_id).await
    }

    /// The final result of a session with its graded answers.
    pub async fn get_result(
        &self,
        session_id: i64,
        owner_id: i64,
    ) -> Result<ExamResultDetail, AppError> {
        let session = self.find_owned(session_id, owner_id).await?;

        let result = result_store::find_by_session(&self.pool, session_id)
            .await?
            .filter(|r| r.is_final)
            .ok_or_else(|| AppError::NotFound(format!("Result for exam {} not found", session_id)))?;

        let answers = result_store::load_answers(&self.pool, result.id).await?;

        Ok(ExamResultDetail {
            result,
            topic_id: session.topic_id,
            answers,
        })
    }

    /// Final results of the owner, newest first.
    pub async fn list_results(&self, owner_id: i64) -> Result<Vec<ExamResult>, AppError> {
        result_store::list_final(&self.pool, owner_id).await
    }
}
