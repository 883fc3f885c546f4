// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (malformed input shape)
    ValidationError(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found (absent, or owned by someone else)
    NotFound(String),

    // 409 Conflict: operation attempted in the wrong session state
    InvalidTransition(String),

    // 410 Gone: the session deadline has passed
    SessionExpired(String),

    // 422 Unprocessable Entity: the topic has no active questions
    InsufficientQuestions(String),

    // 400 Bad Request: option does not belong to the stated question
    InvalidAnswerReference(String),
}

impl AppError {
    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "INTERNAL_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::SessionExpired(_) => "SESSION_EXPIRED",
            AppError::InsufficientQuestions(_) => "INSUFFICIENT_QUESTIONS",
            AppError::InvalidAnswerReference(_) => "INVALID_ANSWER_REFERENCE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::SessionExpired(_) => StatusCode::GONE,
            AppError::InsufficientQuestions(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidAnswerReference(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::InternalServerError(msg)
            | AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidTransition(msg)
            | AppError::SessionExpired(msg)
            | AppError::InsufficientQuestions(msg)
            | AppError::InvalidAnswerReference(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            other => other.message().to_string(),
        };
        let body = Json(json!({
            "error": error_message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_statuses() {
        let expired = AppError::SessionExpired("late".to_string());
        assert_eq!(expired.kind(), "SESSION_EXPIRED");
        assert_eq!(expired.status(), StatusCode::GONE);

        let transition = AppError::InvalidTransition("already started".to_string());
        assert_eq!(transition.status(), StatusCode::CONFLICT);
        assert_eq!(transition.to_string(), "INVALID_TRANSITION: already started");
    }

    #[test]
    fn test_internal_error_body_is_masked() {
        let response = AppError::InternalServerError("db exploded".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
