use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Clients match on these,
// never on the human-readable message string.

/// Stable error code constants.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Message returned in place of any 5xx detail.
pub const GENERIC_INTERNAL_MESSAGE: &str = "internal server error";

/// Plain-text body of a 429 response.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

// ── Field-level validation detail ───────────────────────────────────

/// Why a single payload field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldReason {
    /// Key absent or null.
    Missing,
    /// Present but not a string.
    WrongType,
    /// Empty string.
    Empty,
    /// Key is not part of the schema.
    NotAllowed,
}

/// One rejected field, as reported in the `details` array of a 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: FieldReason,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: FieldReason) -> Self {
        let field = field.into();
        let message = match reason {
            FieldReason::Missing => format!("\"{}\" is required", field),
            FieldReason::WrongType => format!("\"{}\" must be a string", field),
            FieldReason::Empty => format!("\"{}\" is not allowed to be empty", field),
            FieldReason::NotAllowed => format!("\"{}\" is not allowed", field),
        };
        Self {
            field,
            reason,
            message,
        }
    }
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified service error type.
///
/// Each variant maps to a stable error code (see [`error_code`]) and an
/// HTTP status code. The JSON response always includes both:
///
/// ```json
/// {"code": "UNAUTHENTICATED", "message": "missing authorization token"}
/// ```
///
/// 5xx variants never echo their detail to the caller; it is logged instead.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No route matched. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Request body could not be decoded. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Payload decoded but failed the schema. HTTP 400.
    #[error("{}", join_messages(.0))]
    InvalidFields(Vec<FieldError>),

    /// Request body exceeds the configured limit. HTTP 413.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Missing or invalid authentication credentials. HTTP 401.
    #[error("{0}")]
    Unauthorized(String),

    /// Client exhausted its request quota for the current window. HTTP 429.
    #[error("rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error. HTTP 500.
    #[error("{0}")]
    Internal(String),
}

fn join_messages(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Validation(_) | ServiceError::InvalidFields(_) => {
                error_code::VALIDATION_FAILED
            }
            ServiceError::PayloadTooLarge { .. } => error_code::PAYLOAD_TOO_LARGE,
            ServiceError::Unauthorized(_) => error_code::UNAUTHENTICATED,
            ServiceError::RateLimited { .. } => error_code::RATE_LIMITED,
            ServiceError::Storage(_) => error_code::STORAGE_ERROR,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) | ServiceError::InvalidFields(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to send to the caller.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            GENERIC_INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }

        if let ServiceError::RateLimited { retry_after } = &self {
            let mut resp = (status, RATE_LIMITED_MESSAGE).into_response();
            // Round up so clients never retry a moment too early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            return resp;
        }

        let mut body = serde_json::json!({
            "code": self.error_code(),
            "message": self.public_message(),
        });
        if let ServiceError::InvalidFields(fields) = &self {
            body["details"] = serde_json::json!(fields);
        }
        (status, axum::Json(body)).into_response()
    }
}
