// tests/common/mod.rs

#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use exam_engine::{
    ExamService, db,
    models::{exam_result::AnswerInput, exam_session::CreateExamRequest},
    services::statistics::{SqlTopicStatistics, StatisticsSink},
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

/// A question seeded for tests, with one right and one wrong option.
#[derive(Debug, Clone, Copy)]
pub struct SeededQuestion {
    pub id: i64,
    pub correct_option: i64,
    pub wrong_option: i64,
}

/// Fresh in-memory database with migrations applied.
///
/// A single, never-recycled connection keeps the in-memory database alive
/// for the whole test.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// File-backed database opened the way the server opens it: WAL, several
/// connections, busy timeout. The directory must outlive the pool.
pub async fn file_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("exams.db").display());

    let pool = db::connect_with_retry(&url)
        .await
        .expect("Failed to open file database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to migrate database");

    (dir, pool)
}

pub fn service(pool: &SqlitePool) -> ExamService {
    service_with_sink(pool, Arc::new(SqlTopicStatistics))
}

pub fn service_with_sink(pool: &SqlitePool, sink: Arc<dyn StatisticsSink>) -> ExamService {
    ExamService::new(pool.clone(), sink, 2)
}

pub async fn seed_topic(pool: &SqlitePool, title: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO topics (title) VALUES (?) RETURNING id")
        .bind(title)
        .fetch_one(pool)
        .await
        .expect("Failed to seed topic")
}

/// Seeds `count` active questions with four options each; the first option is correct.
pub async fn seed_questions(pool: &SqlitePool, topic_id: i64, count: usize) -> Vec<SeededQuestion> {
    let mut seeded = Vec::with_capacity(count);

    for i in 0..count {
        let question_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO questions (topic_id, text, explanation, difficulty, active)
             VALUES (?, ?, ?, 'medium', 1)
             RETURNING id",
        )
        .bind(topic_id)
        .bind(format!("Question {}", i))
        .bind("Because A")
        .fetch_one(pool)
        .await
        .expect("Failed to seed question");

        let mut option_ids = Vec::with_capacity(4);
        for (j, label) in ["A", "B", "C", "D"].iter().enumerate() {
            let option_id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO answer_options (question_id, text, is_correct)
                 VALUES (?, ?, ?)
                 RETURNING id",
            )
            .bind(question_id)
            .bind(*label)
            .bind(j == 0)
            .fetch_one(pool)
            .await
            .expect("Failed to seed option");
            option_ids.push(option_id);
        }

        seeded.push(SeededQuestion {
            id: question_id,
            correct_option: option_ids[0],
            wrong_option: option_ids[1],
        });
    }

    seeded
}

pub fn create_request(topic_id: i64, question_count: i64) -> CreateExamRequest {
    CreateExamRequest {
        topic_id,
        duration_minutes: 30,
        question_count,
    }
}

/// Creates and starts an exam, returning its id and the assigned question ids in order.
pub async fn started_exam(
    exams: &ExamService,
    owner_id: i64,
    topic_id: i64,
    question_count: i64,
) -> (i64, Vec<i64>) {
    let session = exams
        .create(owner_id, &create_request(topic_id, question_count))
        .await
        .expect("create failed");
    let started = exams.start(session.id, owner_id).await.expect("start failed");
    let ids = started.questions.iter().map(|q| q.id).collect();
    (session.id, ids)
}

/// Rewrites the timing of a session so that its deadline is `deadline`.
pub async fn move_deadline(pool: &SqlitePool, session_id: i64, deadline: DateTime<Utc>) {
    sqlx::query("UPDATE exam_sessions SET started_at = ?, deadline = ? WHERE id = ?")
        .bind(deadline - Duration::minutes(30))
        .bind(deadline)
        .bind(session_id)
        .execute(pool)
        .await
        .expect("Failed to move deadline");
}

/// Answers built from the seed: the first `correct` questions right, the rest wrong.
pub fn answers_with_correct(
    assigned: &[i64],
    seeded: &[SeededQuestion],
    correct: usize,
) -> Vec<AnswerInput> {
    assigned
        .iter()
        .enumerate()
        .map(|(index, question_id)| {
            let q = seeded
                .iter()
                .find(|s| s.id == *question_id)
                .expect("assigned question was seeded");
            AnswerInput {
                question_id: q.id,
                option_id: Some(if index < correct { q.correct_option } else { q.wrong_option }),
            }
        })
        .collect()
}

pub async fn session_state(pool: &SqlitePool, session_id: i64) -> String {
    sqlx::query_scalar::<_, String>("SELECT state FROM exam_sessions WHERE id = ?")
        .bind(session_id)
        .fetch_one(pool)
        .await
        .expect("session exists")
}

pub async fn count_rows(pool: &SqlitePool, sql: &str, id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("count query failed")
}
