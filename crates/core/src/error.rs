//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// One variant per outward error class; the api boundary maps each variant to
/// its HTTP status. `Internal` carries detail for server-side logs only and
/// must never be serialized into a response body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Caller could not be authenticated (missing/invalid/expired session).
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller is authenticated but their role is not permitted.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A requested resource was not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness invariant was violated (role name, user email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unexpected persistence/runtime failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
