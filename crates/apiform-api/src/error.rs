//! # API Error Types
//!
//! Structured error type for everything that can go wrong while serving a
//! request. Each variant maps to one HTTP status and a JSON body of the form
//! `{"error": {"code", "message", "details"?}}`. Validation failures list
//! every violation in `details`; 500-class errors never expose their cause.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use apiform_schema::{ValidationViolations, Violation};

use crate::dispatch::{HandlerError, RawResponse};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Every constraint violation, present only for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Violation>>,
}

/// Application-level error.
#[derive(Error, Debug)]
pub enum AppError {
    /// No operation matches the method and path (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body exceeded the size limit (413).
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// One or more fields violated their constraints (422).
    #[error("validation failed: {0}")]
    Validation(ValidationViolations),

    /// The operation handler failed (500). Logged, not returned to the client.
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Internal server error (500). Logged, not returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Handler(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, Self::Handler(_) | Self::Internal(_))
    }

    /// Render into the dispatcher's response type.
    pub fn into_raw_response(self) -> RawResponse {
        let (status, code) = self.status_and_code();

        if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
        }

        let (message, details) = match self {
            Self::Validation(violations) => {
                ("validation failed".to_string(), Some(violations.into_inner()))
            }
            Self::Handler(_) | Self::Internal(_) => {
                ("An internal error occurred".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        RawResponse::json(status, &body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_raw_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiform_schema::{validate, FieldSchema, Method, OperationSchema, RawInput};

    fn violations() -> ValidationViolations {
        let schema = OperationSchema::new("post-review", Method::Post, "/reviews")
            .input(FieldSchema::string("author").required().max_length(10))
            .input(FieldSchema::integer("rating").required().minimum(1).maximum(5));
        validate(&schema, &RawInput::new()).unwrap_err()
    }

    fn body_of(err: AppError) -> (StatusCode, ErrorBody) {
        let resp = err.into_raw_response();
        let body: ErrorBody = serde_json::from_slice(&resp.body).unwrap();
        (resp.status, body)
    }

    #[test]
    fn not_found_status_code() {
        let (status, code) = AppError::NotFound("GET /x".into()).status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn bad_request_status_code() {
        let (status, code) = AppError::BadRequest("malformed".into()).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[test]
    fn payload_too_large_status_code() {
        let (status, body) = body_of(AppError::PayloadTooLarge(1024));
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body.error.code, "PAYLOAD_TOO_LARGE");
        assert!(body.error.message.contains("1024"));
    }

    #[test]
    fn validation_status_code() {
        let (status, code) = AppError::Validation(violations()).status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "VALIDATION_ERROR");
    }

    #[test]
    fn handler_error_is_internal() {
        let err = AppError::from(HandlerError::Downstream("db down".into()));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
    }

    #[test]
    fn validation_body_lists_every_violation() {
        let (status, body) = body_of(AppError::Validation(violations()));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error.message, "validation failed");
        let details = body.error.details.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].field, "author");
        assert_eq!(details[1].field, "rating");
    }

    #[test]
    fn not_found_body_has_no_details() {
        let (status, body) = body_of(AppError::NotFound("GET /x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.error.message.contains("GET /x"));
        assert!(body.error.details.is_none());
    }

    #[test]
    fn internal_hides_details() {
        let (status, body) = body_of(AppError::Internal("db connection failed".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");

        let (_, body) = body_of(HandlerError::Downstream("disk full".into()).into());
        assert!(!body.error.message.contains("disk full"));
    }

    #[test]
    fn error_body_omits_absent_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "TEST".to_string(),
                message: "test message".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("TEST"));
        assert!(!json.contains("details"));
    }
}
