// src/services/result_store.rs

//! Persistence for `exam_results` and their `user_answers`.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};

use crate::{
    error::AppError,
    models::exam_result::{ExamResult, UserAnswer},
};

const RESULT_COLUMNS: &str = "id, session_id, user_id, total_questions, correct_count, \
     score_percent, score_total, actual_duration_minutes, started_at, finished_at, is_final, \
     created_at, updated_at";

/// Computed outcome of a final submission.
#[derive(Debug, Clone, Copy)]
pub struct FinalScore {
    pub total_questions: i64,
    pub correct_count: i64,
    pub score_percent: f64,
    pub score_total: i64,
    pub actual_duration_minutes: i64,
}

/// The result row of a session, provisional or final.
pub async fn find_by_session<'e, E>(
    executor: E,
    session_id: i64,
) -> Result<Option<ExamResult>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query_as::<_, ExamResult>(&format!(
        "SELECT {RESULT_COLUMNS} FROM exam_results WHERE session_id = ?"
    ))
    .bind(session_id)
    .fetch_optional(executor)
    .await?;

    Ok(result)
}

pub async fn list_final<'e, E>(executor: E, owner_id: i64) -> Result<Vec<ExamResult>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let results = sqlx::query_as::<_, ExamResult>(&format!(
        "SELECT {RESULT_COLUMNS} FROM exam_results
         WHERE user_id = ? AND is_final = 1
         ORDER BY finished_at DESC, id DESC"
    ))
    .bind(owner_id)
    .fetch_all(executor)
    .await?;

    Ok(results)
}

/// Returns the id of the session's provisional result, creating a zeroed one if absent.
pub async fn ensure_provisional(
    conn: &mut SqliteConnection,
    session_id: i64,
    owner_id: i64,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<i64, AppError> {
    if let Some(existing) = find_by_session(&mut *conn, session_id).await? {
        if existing.is_final {
            return Err(AppError::InvalidTransition(format!(
                "Exam {} already has a final result",
                session_id
            )));
        }
        return Ok(existing.id);
    }

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO exam_results
            (session_id, user_id, started_at, finished_at, is_final, created_at, updated_at)
         VALUES (?, ?, ?, NULL, 0, ?, ?)
         RETURNING id",
    )
    .bind(session_id)
    .bind(owner_id)
    .bind(started_at)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create provisional result for session {}: {:?}", session_id, e);
        AppError::from(e)
    })?;

    Ok(id)
}

pub async fn update_progress<'e, E>(
    executor: E,
    result_id: i64,
    actual_duration_minutes: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "UPDATE exam_results SET actual_duration_minutes = ?, updated_at = ?
         WHERE id = ? AND is_final = 0",
    )
    .bind(actual_duration_minutes)
    .bind(now)
    .bind(result_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Writes the final score, finalizing the provisional row in place when one exists.
pub async fn save_final<'e, E>(
    executor: E,
    session_id: i64,
    owner_id: i64,
    started_at: DateTime<Utc>,
    score: &FinalScore,
    now: DateTime<Utc>,
) -> Result<i64, AppError>
where
    E: SqliteExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO exam_results
            (session_id, user_id, total_questions, correct_count, score_percent, score_total,
             actual_duration_minutes, started_at, finished_at, is_final, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
         ON CONFLICT(session_id) DO UPDATE SET
            total_questions = excluded.total_questions,
            correct_count = excluded.correct_count,
            score_percent = excluded.score_percent,
            score_total = excluded.score_total,
            actual_duration_minutes = excluded.actual_duration_minutes,
            finished_at = excluded.finished_at,
            is_final = 1,
            updated_at = excluded.updated_at
         RETURNING id",
    )
    .bind(session_id)
    .bind(owner_id)
    .bind(score.total_questions)
    .bind(score.correct_count)
    .bind(score.score_percent)
    .bind(score.score_total)
    .bind(score.actual_duration_minutes)
    .bind(started_at)
    .bind(now)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save final result for session {}: {:?}", session_id, e);
        AppError::from(e)
    })?;

    Ok(id)
}

/// Replaces every answer row of a result with `answers`.
pub async fn replace_answers(
    conn: &mut SqliteConnection,
    result_id: i64,
    answers: &[UserAnswer],
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM user_answers WHERE result_id = ?")
        .bind(result_id)
        .execute(&mut *conn)
        .await?;

    if answers.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "INSERT INTO user_answers (result_id, question_id, option_id, is_correct, created_at) ",
    );
    query_builder.push_values(answers, |mut row, answer| {
        row.push_bind(result_id)
            .push_bind(answer.question_id)
            .push_bind(answer.option_id)
            .push_bind(answer.is_correct)
            .push_bind(now);
    });

    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}

pub async fn load_answers<'e, E>(executor: E, result_id: i64) -> Result<Vec<UserAnswer>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let answers = sqlx::query_as::<_, UserAnswer>(
        "SELECT question_id, option_id, is_correct FROM user_answers
         WHERE result_id = ?
         ORDER BY id ASC",
    )
    .bind(result_id)
    .fetch_all(executor)
    .await?;

    Ok(answers)
}
