//! Error types for the catalog
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors fall into the categories reported by [`Error::kind`]: caller
//! mistakes are never retried, backend failures surface as unavailable.

use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// A submitted document failed validation
///
/// Nothing is persisted when validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The `id` field is absent or empty. A fresh id is minted and echoed
    /// back to the caller; it is never assigned to the stored document.
    #[error("document id is missing or empty (suggested id {generated_id})")]
    MissingId {
        /// Freshly minted replacement id
        generated_id: String,
    },

    /// A mandatory field is absent
    #[error("mandatory field '{0}' is missing")]
    MissingField(String),

    /// A mandatory field is present but null or blank
    #[error("mandatory field '{0}' is empty")]
    EmptyField(String),
}

impl ValidationError {
    /// Render the error payload returned to the caller
    ///
    /// Missing ids answer with `{"id": "<uuid>"}`, field problems with
    /// `{"error": "mandatory field '<f>' is missing|empty"}`.
    pub fn body(&self) -> Value {
        match self {
            ValidationError::MissingId { generated_id } => json!({ "id": generated_id }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

/// Coarse classification used by request layers to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; reported immediately, never retried
    Validation,
    /// Unknown document
    NotFound,
    /// Backend transport, index or snapshot failure
    Unavailable,
    /// Corrupt stored data or bad local configuration
    Internal,
}

/// Error types for the catalog
#[derive(Debug, Error)]
pub enum Error {
    /// Submitted document is invalid
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// `since` parameter does not match `^[1-9][0-9]*[dw]$`
    #[error("{0} is not a valid parameter")]
    InvalidTimeWindow(String),

    /// Malformed request parameter other than `since`
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Referenced document does not exist
    #[error("document with id {0} not found")]
    DocumentNotFound(String),

    /// Backend could not be reached
    #[error("backend unavailable during {operation}: {reason}")]
    BackendUnavailable {
        /// Operation being attempted
        operation: &'static str,
        /// Underlying cause
        reason: String,
    },

    /// Backend reported a failure for an index operation
    #[error("backend error during {operation} on index '{index}': {reason}")]
    Backend {
        /// Operation being attempted
        operation: &'static str,
        /// Target index
        index: String,
        /// Underlying cause
        reason: String,
    },

    /// Backend accepted the request but did not create or update the record
    #[error("{id} wasn't indexed successfully in '{index}': {outcome}")]
    WriteRejected {
        /// Target index
        index: String,
        /// Record id
        id: String,
        /// Outcome reported by the backend
        outcome: String,
    },

    /// JSON patch could not be applied to a document
    #[error("Patch error: {0}")]
    Patch(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a backend error with operation and index context
    pub fn backend(operation: &'static str, index: impl Into<String>, reason: impl ToString) -> Self {
        Error::Backend {
            operation,
            index: index.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a backend-unavailable error
    pub fn unavailable(operation: &'static str, reason: impl ToString) -> Self {
        Error::BackendUnavailable {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::InvalidTimeWindow(_) | Error::InvalidRequest(_) => {
                ErrorKind::Validation
            }
            Error::DocumentNotFound(_) => ErrorKind::NotFound,
            Error::BackendUnavailable { .. } | Error::Backend { .. } | Error::WriteRejected { .. } => {
                ErrorKind::Unavailable
            }
            Error::Patch(_) | Error::Serialization(_) | Error::Config(_) => ErrorKind::Internal,
        }
    }

    /// Payload for validation failures, if this is one
    pub fn validation_body(&self) -> Option<Value> {
        match self {
            Error::Validation(v) => Some(v.body()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
