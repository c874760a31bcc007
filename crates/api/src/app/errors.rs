//! Consistent JSON error responses.
//!
//! Every outward error is a JSON object with an `error` field (or `errors`
//! for field validation), with a status from {400, 401, 403, 404, 500}.
//! Internal detail never leaves the process — it is logged and replaced by a
//! generic message.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use warden_core::error::DomainError;

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// One failed input field, express-style.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

pub fn validation_error(errors: Vec<FieldError>) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
}

/// Body-level JSON parse/shape failure (still a 400 with our error shape).
pub fn bad_json(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        DomainError::Unauthenticated(msg) => json_error(StatusCode::UNAUTHORIZED, msg),
        DomainError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, msg),
        DomainError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, format!("{what} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        DomainError::Internal(detail) => {
            tracing::error!(error = %detail, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "Forbidden: insufficient role")
}
