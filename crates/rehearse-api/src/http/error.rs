//! Application error type mapping domain errors to HTTP status codes and
//! the envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use rehearse_types::error::SessionError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session-domain errors.
    Session(SessionError),
    /// Credential supplied but invalid.
    Unauthenticated(String),
    /// Malformed request outside the session domain.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl AppError {
    fn status_code_and_message(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Session(SessionError::NotFound) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                "Session not found".to_string(),
            ),
            AppError::Session(SessionError::StateInvalid(msg)) => (
                StatusCode::CONFLICT,
                "SESSION_STATE_INVALID",
                msg.clone(),
            ),
            AppError::Session(SessionError::Timeout) => (
                StatusCode::GONE,
                "SESSION_TIMEOUT",
                "Session timed out; start a new session".to_string(),
            ),
            AppError::Session(SessionError::CapacityExhausted(provider)) => (
                StatusCode::TOO_MANY_REQUESTS,
                "CAPACITY_EXHAUSTED",
                format!("Capacity exhausted for '{provider}'; retry shortly"),
            ),
            AppError::Session(SessionError::AgentUnavailable(msg)) => (
                StatusCode::BAD_GATEWAY,
                "AGENT_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::Session(SessionError::PersistenceDegraded(msg)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_DEGRADED",
                msg.clone(),
            ),
            AppError::Session(SessionError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_code_and_message();

        let body = json!({
            "data": null,
            "meta": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
