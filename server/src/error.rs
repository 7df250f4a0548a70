//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tally_engine::Error as EngineError;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Status code and machine readable code for an engine error.
fn engine_status(e: &EngineError) -> (StatusCode, &'static str) {
    match e {
        EngineError::InvalidMapping(_) => (StatusCode::BAD_REQUEST, "invalid_mapping"),
        EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        EngineError::AlreadyProcessed(_) => (StatusCode::CONFLICT, "already_processed"),
        EngineError::InvalidState(_) => (StatusCode::BAD_REQUEST, "invalid_state"),
        EngineError::InvalidSnapshot(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_snapshot"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message, details) = match &self {
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                let (status, code) = engine_status(e);
                (status, code, e.to_string(), None)
            }
            AppError::Csv(e) => {
                tracing::warn!("CSV error: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    "invalid_csv",
                    "Invalid CSV data".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let cases = [
            (EngineError::InvalidMapping("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (EngineError::AlreadyProcessed("x".into()), StatusCode::CONFLICT),
            (EngineError::InvalidState("x".into()), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn internal_error_is_500() {
        let response = AppError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
