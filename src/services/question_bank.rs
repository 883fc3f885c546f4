// src/services/question_bank.rs

//! Read-only access to topics, questions and their answer options.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};

use crate::{
    error::AppError,
    models::question::{AnswerOption, Question, Topic},
};

const QUESTION_COLUMNS: &str = "id, topic_id, text, explanation, difficulty, active";

pub async fn find_topic<'e, E>(executor: E, topic_id: i64) -> Result<Option<Topic>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let topic = sqlx::query_as::<_, Topic>("SELECT id, title FROM topics WHERE id = ?")
        .bind(topic_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch topic {}: {:?}", topic_id, e);
            AppError::from(e)
        })?;

    Ok(topic)
}

/// Draws up to `count` distinct active questions of a topic in random order,
/// each with its answer options.
///
/// Returns fewer than `count` when the bank is smaller; callers decide
/// whether an empty draw is fatal.
pub async fn find_random_questions(
    conn: &mut SqliteConnection,
    topic_id: i64,
    count: i64,
) -> Result<Vec<Question>, AppError> {
    let mut questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM questions
         WHERE topic_id = ? AND active = 1
         ORDER BY RANDOM()
         LIMIT ?"
    ))
    .bind(topic_id)
    .bind(count)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to draw random questions for topic {}: {:?}", topic_id, e);
        AppError::from(e)
    })?;

    attach_options(conn, &mut questions).await?;

    Ok(questions)
}

/// Loads full questions by id. The returned order is unspecified.
pub async fn find_questions_by_ids(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> Result<Vec<Question>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    // Use QueryBuilder for dynamic IN clause
    let mut query_builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ("
    ));
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let mut questions: Vec<Question> = query_builder
        .build_query_as()
        .fetch_all(&mut *conn)
        .await?;

    attach_options(conn, &mut questions).await?;

    Ok(questions)
}

pub async fn find_option_by_question_and_id<'e, E>(
    executor: E,
    question_id: i64,
    option_id: i64,
) -> Result<Option<AnswerOption>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let option = sqlx::query_as::<_, AnswerOption>(
        "SELECT id, question_id, text, is_correct FROM answer_options
         WHERE id = ? AND question_id = ?",
    )
    .bind(option_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await?;

    Ok(option)
}

async fn attach_options(
    conn: &mut SqliteConnection,
    questions: &mut [Question],
) -> Result<(), AppError> {
    if questions.is_empty() {
        return Ok(());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, text, is_correct FROM answer_options WHERE question_id IN (",
    );
    let mut separated = query_builder.separated(",");
    for question in questions.iter() {
        separated.push_bind(question.id);
    }
    separated.push_unseparated(") ORDER BY question_id, id");

    let options: Vec<AnswerOption> = query_builder
        .build_query_as()
        .fetch_all(&mut *conn)
        .await?;

    let mut by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    for question in questions.iter_mut() {
        question.options = by_question.remove(&question.id).unwrap_or_default();
    }

    Ok(())
}
