// src/services/lifecycle.rs

//! Exam session state machine: create, start, continue, status.
//!
//! Expiry is lazy. Every read or write of a `STARTED` session first checks its
//! deadline and flips it to `EXPIRED` when the deadline has passed.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        exam_session::{CreateExamRequest, ExamSession, ExamState, ExamStatus, ExamWithQuestions},
        question::{ExamQuestion, Question},
    },
    services::{
        assignment_ledger, question_bank, result_store,
        session_store::{self, NewSession},
        statistics::StatisticsSink,
    },
};

/// Entry point for every exam session operation.
///
/// Each call is scoped by `(session_id, owner_id)`; a session owned by someone
/// else behaves exactly like a missing one.
#[derive(Clone)]
pub struct ExamService {
    pub(crate) pool: SqlitePool,
    pub(crate) statistics: Arc<dyn StatisticsSink>,
    pub(crate) submit_grace: Duration,
}

impl ExamService {
    pub fn new(
        pool: SqlitePool,
        statistics: Arc<dyn StatisticsSink>,
        submit_grace_seconds: i64,
    ) -> Self {
        Self {
            pool,
            statistics,
            submit_grace: Duration::seconds(submit_grace_seconds.max(0)),
        }
    }

    /// Creates a `PENDING` session for an existing topic.
    pub async fn create(
        &self,
        owner_id: i64,
        req: &CreateExamRequest,
    ) -> Result<ExamSession, AppError> {
        req.validate()?;

        let topic = question_bank::find_topic(&self.pool, req.topic_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", req.topic_id)))?;

        let new = NewSession {
            title: format!("Exam - Topic: {}", topic.title),
            topic_id: topic.id,
            user_id: owner_id,
            total_questions: req.question_count,
            duration_minutes: req.duration_minutes,
        };
        let session = session_store::insert_session(&self.pool, &new, Utc::now()).await?;

        tracing::info!("Exam {} created for user {} on topic {}", session.id, owner_id, topic.id);

        Ok(session)
    }

    /// `PENDING -> STARTED`: draws the questions, fixes their order and sets the deadline.
    ///
    /// The state change and the assignment rows commit together. When the bank
    /// has no active question for the topic nothing is written and the session
    /// stays `PENDING`.
    pub async fn start(&self, session_id: i64, owner_id: i64) -> Result<ExamWithQuestions, AppError> {
        let session = self.find_owned(session_id, owner_id).await?;

        if session.state != ExamState::Pending {
            return Err(already_moved(&session, "start"));
        }

        let started_at = Utc::now();
        let deadline = started_at + Duration::minutes(session.duration_minutes);

        let mut tx = self.pool.begin().await?;

        if !session_store::mark_started(&mut *tx, session_id, owner_id, started_at, deadline).await? {
            return Err(AppError::InvalidTransition(format!(
                "Exam {} has already been started",
                session_id
            )));
        }

        let questions =
            question_bank::find_random_questions(&mut tx, session.topic_id, session.total_questions)
                .await?;

        if questions.is_empty() {
            return Err(AppError::InsufficientQuestions(format!(
                "No active questions available for topic {}",
                session.topic_id
            )));
        }

        if (questions.len() as i64) < session.total_questions {
            tracing::warn!(
                "Requested {} questions but only {} are available for topic {}",
                session.total_questions,
                questions.len(),
                session.topic_id
            );
        }

        let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        assignment_ledger::record_assignment(&mut *tx, session_id, &question_ids, started_at)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Exam {} started by user {} with {} questions, deadline {}",
            session_id,
            owner_id,
            question_ids.len(),
            deadline
        );

        let session = self.find_owned(session_id, owner_id).await?;
        let questions: Vec<ExamQuestion> = questions
            .into_iter()
            .enumerate()
            .map(|(index, question)| ExamQuestion::from_question(question, index as i64 + 1))
            .collect();

        Ok(ExamWithQuestions {
            exam: session,
            assigned_questions: questions.len(),
            questions,
        })
    }

    /// Replays a running session: assigned questions in their original order,
    /// with any saved answers filled in.
    pub async fn continue_exam(
        &self,
        session_id: i64,
        owner_id: i64,
    ) -> Result<ExamWithQuestions, AppError> {
        let session = self.find_owned(session_id, owner_id).await?;

        if session.state != ExamState::Started {
            return Err(not_running(&session));
        }

        let now = Utc::now();
        if session.is_overdue(now, Duration::zero()) {
            self.expire(session, now).await?;
            return Err(AppError::SessionExpired(format!(
                "Time for exam {} has run out",
                session_id
            )));
        }

        let mut conn = self.pool.acquire().await?;

        let entries = assignment_ledger::assignment_order(&mut *conn, session_id).await?;
        let ids: Vec<i64> = entries.iter().map(|e| e.question_id).collect();
        let mut by_id: HashMap<i64, Question> =
            question_bank::find_questions_by_ids(&mut conn, &ids)
                .await?
                .into_iter()
                .map(|q| (q.id, q))
                .collect();

        let saved: HashMap<i64, Option<i64>> =
            match result_store::find_by_session(&mut *conn, session_id).await? {
                Some(result) if !result.is_final => {
                    result_store::load_answers(&mut *conn, result.id)
                        .await?
                        .into_iter()
                        .map(|a| (a.question_id, a.option_id))
                        .collect()
                }
                _ => HashMap::new(),
            };

        let mut questions = Vec::with_capacity(entries.len());
        for entry in &entries {
            let Some(question) = by_id.remove(&entry.question_id) else {
                return Err(AppError::InternalServerError(format!(
                    "Question {} assigned to exam {} no longer exists",
                    entry.question_id, session_id
                )));
            };
            let mut exam_question = ExamQuestion::from_question(question, entry.ordinal);
            exam_question.selected_option_id = saved.get(&entry.question_id).copied().flatten();
            questions.push(exam_question);
        }

        Ok(ExamWithQuestions {
            exam: session,
            assigned_questions: questions.len(),
            questions,
        })
    }

    /// Timing snapshot of a session. An overdue session is reported as `EXPIRED`.
    pub async fn status(&self, session_id: i64, owner_id: i64) -> Result<ExamStatus, AppError> {
        let now = Utc::now();
        let session = self.find_owned(session_id, owner_id).await?;
        let session = self.refresh(session, now).await?;

        Ok(timing(&session, now))
    }

    /// Session detail with lazy expiry applied.
    pub async fn get(&self, session_id: i64, owner_id: i64) -> Result<ExamSession, AppError> {
        let session = self.find_owned(session_id, owner_id).await?;
        self.refresh(session, Utc::now()).await
    }

    /// The owner's sessions, newest first, with lazy expiry applied.
    pub async fn list(&self, owner_id: i64) -> Result<Vec<ExamSession>, AppError> {
        let now = Utc::now();
        let sessions = session_store::list_owned(&self.pool, owner_id).await?;

        let mut refreshed = Vec::with_capacity(sessions.len());
        for session in sessions {
            refreshed.push(self.refresh(session, now).await?);
        }

        Ok(refreshed)
    }

    /// Flips every overdue `STARTED` session to `EXPIRED`. Returns how many moved.
    pub async fn expire_overdue(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut expired = 0;

        for session in session_store::list_started(&self.pool).await? {
            if session.is_overdue(now, Duration::zero())
                && session_store::mark_expired(&self.pool, session.id, now).await?
            {
                tracing::info!("Exam {} expired by sweep", session.id);
                expired += 1;
            }
        }

        Ok(expired)
    }

    pub(crate) async fn find_owned(
        &self,
        session_id: i64,
        owner_id: i64,
    ) -> Result<ExamSession, AppError> {
        session_store::find_owned(&self.pool, session_id, owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Exam {} not found", session_id)))
    }

    /// Applies lazy expiry to a freshly read session.
    async fn refresh(&self, session: ExamSession, now: DateTime<Utc>) -> Result<ExamSession, AppError> {
        if session.is_overdue(now, Duration::zero()) {
            self.expire(session, now).await
        } else {
            Ok(session)
        }
    }

    /// `STARTED -> EXPIRED`. If another request moved the session first, the
    /// stored state wins and is returned instead.
    pub(crate) async fn expire(
        &self,
        mut session: ExamSession,
        now: DateTime<Utc>,
    ) -> Result<ExamSession, AppError> {
        if session_store::mark_expired(&self.pool, session.id, now).await? {
            tracing::info!("Exam {} of user {} expired", session.id, session.user_id);
            session.state = ExamState::Expired;
            session.updated_at = now;
            return Ok(session);
        }

        self.find_owned(session.id, session.user_id).await
    }
}

pub(crate) fn not_running(session: &ExamSession) -> AppError {
    if session.state.is_terminal() {
        AppError::InvalidTransition(format!(
            "Exam {} has already ended (state {:?})",
            session.id, session.state
        ))
    } else {
        AppError::InvalidTransition(format!("Exam {} has not been started", session.id))
    }
}

fn already_moved(session: &ExamSession, action: &str) -> AppError {
    AppError::InvalidTransition(format!(
        "Cannot {} exam {} in state {:?}",
        action, session.id, session.state
    ))
}

/// Remaining time and elapsed share of a session at `now`.
fn timing(session: &ExamSession, now: DateTime<Utc>) -> ExamStatus {
    let total_seconds = session.duration_minutes * 60;

    let (remaining_seconds, percent_elapsed) = match (session.state, session.started_at, session.deadline) {
        (ExamState::Started, Some(started_at), Some(deadline)) => (
            Some((deadline - now).num_seconds().max(0)),
            percent_of(now - started_at, total_seconds),
        ),
        (ExamState::Finished, Some(started_at), _) => {
            (None, percent_of(session.updated_at - started_at, total_seconds))
        }
        (ExamState::Expired, _, _) => (None, 100),
        _ => (None, 0),
    };

    ExamStatus {
        exam_id: session.id,
        state: session.state,
        remaining_seconds,
        total_seconds,
        percent_elapsed,
    }
}

fn percent_of(elapsed: Duration, total_seconds: i64) -> i64 {
    if total_seconds <= 0 {
        return 100;
    }
    let percent = (elapsed.num_seconds() as f64 / total_seconds as f64 * 100.0).round() as i64;
    percent.clamp(0, 100)
}
