//! # Error Hierarchy
//!
//! Structured error types shared across the stack, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.

use thiserror::Error;

/// Top-level error type for the foundational layer.
#[derive(Error, Debug)]
pub enum VrsError {
    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A persisted value could not be interpreted.
    #[error("corrupt record: {0}")]
    Corruption(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for domain primitives.
///
/// Each variant carries the offending input so callers can report it
/// without re-deriving context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A date range whose end does not come after its start.
    #[error("invalid date range: end {end} must be after start {start}")]
    InvertedRange {
        /// The requested first day.
        start: chrono::NaiveDate,
        /// The requested exclusive last day.
        end: chrono::NaiveDate,
    },

    /// A date string that is not `YYYY-MM-DD`.
    #[error("invalid date: \"{0}\" (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// An identifier string that is not a UUID.
    #[error("invalid {kind} identifier: \"{value}\"")]
    InvalidIdentifier {
        /// Which identifier type was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// An enumerated name (role, status) outside the known set.
    #[error("unknown {kind}: \"{value}\"")]
    UnknownName {
        /// Which enumeration was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A free-text field that must not be blank.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A number outside its allowed inclusive range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// The field being validated.
        field: &'static str,
        /// The rejected input.
        value: i64,
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
}
