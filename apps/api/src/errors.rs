use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type for the HTTP boundary.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Error from an external capability call, split by retryability.
///
/// `Transient` covers rate limits, timeouts, connect failures and 5xx —
/// the shared retry policy re-attempts those. `Permanent` covers auth
/// failures, malformed schemas and other client errors; retrying cannot
/// help, so the call site absorbs or propagates immediately.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("permanent provider error: {0}")]
    Permanent(String),
}

impl CapabilityError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CapabilityError::Transient(_))
    }

    /// Classifies an HTTP status: 429 and 5xx are transient, any other
    /// non-success is permanent.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = format!("status {status}: {body}");
        if status.as_u16() == 429 || status.is_server_error() {
            CapabilityError::Transient(message)
        } else {
            CapabilityError::Permanent(message)
        }
    }
}

impl From<reqwest::Error> for CapabilityError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            CapabilityError::Transient(e.to_string())
        } else {
            CapabilityError::Permanent(e.to_string())
        }
    }
}

/// Errors that end a pipeline run. Candidate-level provider errors never
/// become one of these — they are absorbed onto the candidate record.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A stage cannot proceed at all: keyword generation exhausted its
    /// retry budget, or extraction yielded zero usable candidates.
    #[error("pipeline fatal: {0}")]
    Fatal(String),

    #[error("job cancelled: {0}")]
    Cancelled(String),
}
