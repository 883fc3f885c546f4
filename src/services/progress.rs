// src/services/progress.rs

use chrono::{Duration, Utc};

use crate::{
    error::AppError,
    models::{
        exam_result::{AnswerInput, ProgressSaved, UserAnswer},
        exam_session::ExamState,
    },
    services::{
        lifecycle::{ExamService, not_running},
        result_store,
        scoring::{elapsed_minutes, ensure_unique_questions, grade_answers},
        session_store,
    },
};

impl ExamService {
    /// Stores in-progress answers without grading them.
    ///
    /// The provisional result is created on first use and its answers are
    /// replaced wholesale on every call, so repeating a call with the same
    /// answers converges on the same stored rows.
    pub async fn save_progress(
        &self,
        session_id: i64,
        owner_id: i64,
        answers: &[AnswerInput],
    ) -> Result<ProgressSaved, AppError> {
        let session = self.find_owned(session_id, owner_id).await?;
        if session.state != ExamState::Started {
            return Err(not_running(&session));
        }

        // No grace window here: it only applies to the final submission.
        let now = Utc::now();
        if session.is_overdue(now, Duration::zero()) {
            self.expire(session, now).await?;
            return Err(AppError::SessionExpired(format!(
                "Time for exam {} has run out",
                session_id
            )));
        }

        ensure_unique_questions(answers)?;

        let started_at = session.started_at.ok_or_else(|| {
            AppError::InternalServerError(format!("Exam {} is running without a start time", session_id))
        })?;

        let mut tx = self.pool.begin().await?;

        if !session_store::touch_started(&mut *tx, session_id, owner_id, now).await? {
            return Err(AppError::InvalidTransition(format!(
                "Exam {} is no longer in progress",
                session_id
            )));
        }

        // Validated against the bank, but correctness is only decided on submission.
        let saved: Vec<UserAnswer> = grade_answers(&mut tx, session_id, answers)
            .await?
            .into_iter()
            .map(|answer| UserAnswer {
                is_correct: false,
                ..answer
            })
            .collect();

        let actual_duration_minutes = elapsed_minutes(started_at, now);
        let result_id =
            result_store::ensure_provisional(&mut tx, session_id, owner_id, started_at, now).await?;
        result_store::update_progress(&mut *tx, result_id, actual_duration_minutes, now).await?;
        result_store::replace_answers(&mut tx, result_id, &saved, now).await?;

        tx.commit().await?;

        tracing::debug!(
            "Saved {} answers for exam {} of user {}",
            saved.len(),
            session_id,
            owner_id
        );

        Ok(ProgressSaved {
            exam_id: session_id,
            saved_answers: saved.len(),
            actual_duration_minutes,
        })
    }
}
