// tests/api_tests.rs

mod common;

use std::sync::Arc;

use common::{seed_questions, seed_topic, test_pool};
use exam_engine::{
    config::Config,
    routes,
    services::statistics::SqlTopicStatistics,
    state::AppState,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use sqlx::SqlitePool;

const JWT_SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    pool: SqlitePool,
}

/// Helper function to spawn the app on a random port for testing.
async fn spawn_app() -> TestApp {
    // 1. Create an in-memory pool with migrations applied
    let pool = test_pool().await;

    // 2. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        port: 0,
        submit_grace_seconds: 2,
        expiry_sweep_seconds: None,
    };

    let state = AppState::new(pool.clone(), config, Arc::new(SqlTopicStatistics));

    // 3. Create the router with the app state
    let app = routes::create_router(state);

    // 4. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 5. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

fn token_for(user_id: i64) -> String {
    sign_jwt(user_id, JWT_SECRET, 600).expect("Failed to sign token")
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(&format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn exams_require_token() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/exams", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .get(&format!("{}/api/exams", app.address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "UNAUTHORIZED");
}

#[tokio::test]
async fn create_exam_fails_validation() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let topic = seed_topic(&app.pool, "Ownership").await;

    // Act: Ask for fewer questions than allowed
    let response = client
        .post(&format!("{}/api/exams", app.address))
        .bearer_auth(token_for(1))
        .json(&json!({
            "topic_id": topic,
            "duration_minutes": 30,
            "question_count": 1
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn foreign_exam_is_not_found() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let topic = seed_topic(&app.pool, "Ownership").await;

    let created: Value = client
        .post(&format!("{}/api/exams", app.address))
        .bearer_auth(token_for(1))
        .json(&json!({ "topic_id": topic, "duration_minutes": 30, "question_count": 5 }))
        .send()
        .await
        .expect("Failed to create exam")
        .json()
        .await
        .unwrap();
    let exam_id = created["id"].as_i64().unwrap();

    let response = client
        .get(&format!("{}/api/exams/{}", app.address, exam_id))
        .bearer_auth(token_for(2))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn test_exam_flow() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for(7);
    let topic = seed_topic(&app.pool, "Traits").await;
    let seeded = seed_questions(&app.pool, topic, 6).await;

    // 1. Create
    let response = client
        .post(&format!("{}/api/exams", app.address))
        .bearer_auth(&token)
        .json(&json!({ "topic_id": topic, "duration_minutes": 20, "question_count": 5 }))
        .send()
        .await
        .expect("Failed to create exam");
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    let exam_id = created["id"].as_i64().unwrap();
    assert_eq!(created["state"], "PENDING");
    assert_eq!(created["title"], "Exam - Topic: Traits");

    // 2. Start
    let response = client
        .post(&format!("{}/api/exams/{}/start", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to start exam");
    assert_eq!(response.status().as_u16(), 200);
    let started: Value = response.json().await.unwrap();
    assert_eq!(started["state"], "STARTED");
    let questions = started["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);
    assert!(questions[0]["options"][0].get("is_correct").is_none());

    let question_ids: Vec<i64> = questions
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();

    // Starting again is a conflict
    let response = client
        .post(&format!("{}/api/exams/{}/start", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // 3. Status
    let status: Value = client
        .get(&format!("{}/api/exams/{}/status", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["state"], "STARTED");
    assert_eq!(status["total_seconds"], 1200);

    // 4. Save progress on the first question
    let first = seeded.iter().find(|s| s.id == question_ids[0]).unwrap();
    let response = client
        .put(&format!("{}/api/exams/{}/progress", app.address, exam_id))
        .bearer_auth(&token)
        .json(&json!({
            "answers": [{ "question_id": first.id, "option_id": first.correct_option }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let saved: Value = response.json().await.unwrap();
    assert_eq!(saved["saved_answers"], 1);

    // 5. Continue replays the order with the saved answer
    let resumed: Value = client
        .get(&format!("{}/api/exams/{}/continue", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let resumed_ids: Vec<i64> = resumed["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect();
    assert_eq!(resumed_ids, question_ids);
    assert_eq!(resumed["questions"][0]["selected_option_id"], first.correct_option);

    // 6. Submit: four right, one wrong
    let answers: Vec<Value> = question_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let q = seeded.iter().find(|s| s.id == *id).unwrap();
            let option = if i < 4 { q.correct_option } else { q.wrong_option };
            json!({ "question_id": id, "option_id": option })
        })
        .collect();

    let response = client
        .post(&format!("{}/api/exams/{}/submit", app.address, exam_id))
        .bearer_auth(&token)
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["correct_count"], 4);
    assert_eq!(result["total_questions"], 5);
    assert_eq!(result["score_percent"], 80.0);
    assert_eq!(result["is_final"], true);

    // Submitting twice is a conflict
    let response = client
        .post(&format!("{}/api/exams/{}/submit", app.address, exam_id))
        .bearer_auth(&token)
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "INVALID_TRANSITION");

    // 7. Result and history
    let stored: Value = client
        .get(&format!("{}/api/exams/{}/result", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["correct_count"], 4);
    assert_eq!(stored["answers"].as_array().unwrap().len(), 5);

    let history: Value = client
        .get(&format!("{}/api/exams/results", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);

    let exams: Value = client
        .get(&format!("{}/api/exams", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exams[0]["state"], "FINISHED");
}

#[tokio::test]
async fn submit_without_answers_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for(3);
    let topic = seed_topic(&app.pool, "Macros").await;
    seed_questions(&app.pool, topic, 5).await;

    let created: Value = client
        .post(&format!("{}/api/exams", app.address))
        .bearer_auth(&token)
        .json(&json!({ "topic_id": topic, "duration_minutes": 10, "question_count": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exam_id = created["id"].as_i64().unwrap();

    client
        .post(&format!("{}/api/exams/{}/start", app.address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let response = client
        .post(&format!("{}/api/exams/{}/submit", app.address, exam_id))
        .bearer_auth(&token)
        .json(&json!({ "answers": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}
