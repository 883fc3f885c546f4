// src/services/session_store.rs

//! Persistence for `exam_sessions`.
//!
//! Every state change is a conditional UPDATE on the expected current state,
//! so callers learn from the affected row count whether they won the transition.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::{
    error::AppError,
    models::exam_session::{ExamSession, ExamState},
};

const SESSION_COLUMNS: &str = "id, title, topic_id, user_id, total_questions, duration_minutes, \
     started_at, deadline, state, created_at, updated_at";

/// Fields of a session about to be created.
#[derive(Debug)]
pub struct NewSession {
    pub title: String,
    pub topic_id: i64,
    pub user_id: i64,
    pub total_questions: i64,
    pub duration_minutes: i64,
}

pub async fn insert_session<'e, E>(
    executor: E,
    new: &NewSession,
    now: DateTime<Utc>,
) -> Result<ExamSession, AppError>
where
    E: SqliteExecutor<'e>,
{
    let session = sqlx::query_as::<_, ExamSession>(&format!(
        "INSERT INTO exam_sessions
            (title, topic_id, user_id, total_questions, duration_minutes, state, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(&new.title)
    .bind(new.topic_id)
    .bind(new.user_id)
    .bind(new.total_questions)
    .bind(new.duration_minutes)
    .bind(ExamState::Pending)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        tracing::error!("Failed to insert exam session: {:?}", e);
        AppError::from(e)
    })?;

    Ok(session)
}

/// Finds a session by id, scoped to its owner. Sessions of other users are invisible.
pub async fn find_owned<'e, E>(
    executor: E,
    session_id: i64,
    owner_id: i64,
) -> Result<Option<ExamSession>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let session = sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM exam_sessions WHERE id = ? AND user_id = ?"
    ))
    .bind(session_id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await?;

    Ok(session)
}

pub async fn list_owned<'e, E>(executor: E, owner_id: i64) -> Result<Vec<ExamSession>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sessions = sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM exam_sessions
         WHERE user_id = ?
         ORDER BY id DESC"
    ))
    .bind(owner_id)
    .fetch_all(executor)
    .await?;

    Ok(sessions)
}

/// All running sessions across owners, for the expiry sweep.
pub async fn list_started<'e, E>(executor: E) -> Result<Vec<ExamSession>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let sessions = sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM exam_sessions WHERE state = ?"
    ))
    .bind(ExamState::Started)
    .fetch_all(executor)
    .await?;

    Ok(sessions)
}

/// `PENDING -> STARTED`, fixing `started_at` and `deadline`.
pub async fn mark_started<'e, E>(
    executor: E,
    session_id: i64,
    owner_id: i64,
    started_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
) -> Result<bool, AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE exam_sessions
         SET state = ?, started_at = ?, deadline = ?, updated_at = ?
         WHERE id = ? AND user_id = ? AND state = ?",
    )
    .bind(ExamState::Started)
    .bind(started_at)
    .bind(deadline)
    .bind(started_at)
    .bind(session_id)
    .bind(owner_id)
    .bind(ExamState::Pending)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `STARTED -> FINISHED`.
pub async fn mark_finished<'e, E>(
    executor: E,
    session_id: i64,
    owner_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, AppError>
where
    E: SqliteExecutor<'e>,
{
    transition(executor, session_id, Some(owner_id), ExamState::Started, ExamState::Finished, now)
        .await
}

/// `STARTED -> EXPIRED`. A session already moved elsewhere is left untouched.
pub async fn mark_expired<'e, E>(
    executor: E,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, AppError>
where
    E: SqliteExecutor<'e>,
{
    transition(executor, session_id, None, ExamState::Started, ExamState::Expired, now).await
}

/// Bumps `updated_at` of a running session, failing (false) if it is no longer `STARTED`.
pub async fn touch_started<'e, E>(
    executor: E,
    session_id: i64,
    owner_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, AppError>
where
    E: SqliteExecutor<'e>,
{
    transition(executor, session_id, Some(owner_id), ExamState::Started, ExamState::Started, now)
        .await
}

async fn transition<'e, E>(
    executor: E,
    session_id: i64,
    owner_id: Option<i64>,
    from: ExamState,
    to: ExamState,
    now: DateTime<Utc>,
) -> Result<bool, AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE exam_sessions
         SET state = ?, updated_at = ?
         WHERE id = ? AND (? IS NULL OR user_id = ?) AND state = ?",
    )
    .bind(to)
    .bind(now)
    .bind(session_id)
    .bind(owner_id)
    .bind(owner_id)
    .bind(from)
    .execute(executor)
    .await
    .map_err(|e| {
        tracing::error!("Failed to move session {} from {:?} to {:?}: {:?}", session_id, from, to, e);
        AppError::from(e)
    })?;

    Ok(result.rows_affected() == 1)
}
