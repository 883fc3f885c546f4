// src/services/assignment_ledger.rs

//! The ordered set of questions handed to a session when it starts.
//!
//! Rows are written once, in bulk, and are the only source of presentation
//! order afterwards. They are never updated.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::{error::AppError, models::exam_result::AssignmentEntry};

/// Persists `question_ids` for a session with ordinals `1..=k` in the given order.
pub async fn record_assignment<'e, E>(
    executor: E,
    session_id: i64,
    question_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    if question_ids.is_empty() {
        return Err(AppError::InternalServerError(format!(
            "Refusing to record an empty assignment for session {}",
            session_id
        )));
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO exam_questions (session_id, question_id, ordinal, created_at) ",
    );
    query_builder.push_values(question_ids.iter().enumerate(), |mut row, (index, question_id)| {
        row.push_bind(session_id)
            .push_bind(*question_id)
            .push_bind(index as i64 + 1)
            .push_bind(now);
    });

    query_builder
        .build()
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record assignment for session {}: {:?}", session_id, e);
            AppError::from(e)
        })?;

    Ok(())
}

/// The assignment of a session, ordered by ordinal.
pub async fn assignment_order<'e, E>(
    executor: E,
    session_id: i64,
) -> Result<Vec<AssignmentEntry>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let entries = sqlx::query_as::<_, AssignmentEntry>(
        "SELECT session_id, question_id, ordinal FROM exam_questions
         WHERE session_id = ?
         ORDER BY ordinal ASC",
    )
    .bind(session_id)
    .fetch_all(executor)
    .await?;

    Ok(entries)
}
