//! # Booking Errors
//!
//! The typed failure taxonomy every engine operation returns. Callers branch
//! on the variant; nothing is retried inside the engine.

use thiserror::Error;

use vrs_core::ValidationError;
use vrs_state::TransitionError;

/// Failure of a reservation, availability, or directory operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Malformed or contradictory input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced vehicle, reservation, or account does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was being looked up.
        kind: &'static str,
        /// The identifier that missed.
        id: String,
    },

    /// The caller is authenticated but lacks capability for this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No session, or the session could not be verified.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The operation is not legal in the resource's current state.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// The requested interval is not free, or the vehicle cannot take it.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A collaborator store failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl BookingError {
    /// Shorthand for [`BookingError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::FailedPrecondition(_) => "failed_precondition",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<ValidationError> for BookingError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<TransitionError> for BookingError {
    fn from(err: TransitionError) -> Self {
        Self::FailedPrecondition(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vrs_core::ReservationId;
    use vrs_state::ReservationStatus;

    #[test]
    fn validation_maps_to_invalid_argument() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let err: BookingError = ValidationError::InvertedRange {
            start: day,
            end: day,
        }
        .into();
        assert!(matches!(err, BookingError::InvalidArgument(_)));
        assert_eq!(err.kind(), "invalid_argument");
    }

    #[test]
    fn transition_maps_to_failed_precondition() {
        let err: BookingError = TransitionError::InvalidTransition {
            id: ReservationId::new(),
            from: ReservationStatus::Cancelled,
            to: ReservationStatus::Accepted,
        }
        .into();
        assert!(matches!(err, BookingError::FailedPrecondition(_)));
        assert!(err.to_string().contains("CANCELLED"));
    }

    #[test]
    fn not_found_display() {
        let err = BookingError::not_found("vehicle", "abc");
        assert_eq!(err.to_string(), "vehicle abc not found");
        assert_eq!(err.kind(), "not_found");
    }
}
