// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        exam_result::{SaveProgressRequest, SubmitAnswersRequest},
        exam_session::CreateExamRequest,
    },
    services::ExamService,
    utils::jwt::Claims,
};

/// Creates a new exam for the authenticated user.
///
/// Returns 201 Created with the `PENDING` session.
pub async fn create_exam(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = exams.create(claims.user_id()?, &payload).await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Lists the user's exams, newest first.
pub async fn list_exams(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exams.list(claims.user_id()?).await?))
}

pub async fn get_exam(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exams.get(id, claims.user_id()?).await?))
}

/// Starts a pending exam and returns its questions (without answer keys).
pub async fn start_exam(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exams.start(id, claims.user_id()?).await?))
}

/// Resumes a running exam: same questions, same order, saved answers included.
pub async fn continue_exam(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exams.continue_exam(id, claims.user_id()?).await?))
}

pub async fn exam_status(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exams.status(id, claims.user_id()?).await?))
}

/// Saves answers without finishing the exam.
pub async fn save_progress(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        exams
            .save_progress(id, claims.user_id()?, &payload.answers)
            .await?,
    ))
}

/// Submits the exam answers and returns the graded result.
pub async fn submit_exam(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        exams.submit(id, claims.user_id()?, &payload.answers).await?,
    ))
}

pub async fn get_result(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exams.get_result(id, claims.user_id()?).await?))
}

/// Lists the user's graded exams, newest first.
pub async fn list_results(
    State(exams): State<ExamService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exams.list_results(claims.user_id()?).await?))
}
