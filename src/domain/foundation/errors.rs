//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction or state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid value: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an invalid value validation error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    AppointmentNotFound,
    SubscriptionNotFound,
    IntentNotFound,

    // State errors
    InvalidTransition,
    AlreadyPaid,
    SubjectCancelled,
    PaymentNotRequired,
    CheckoutConflict,

    // Reconciliation errors
    ConsistencyViolation,

    // Authorization errors
    Unauthorized,
    Forbidden,

    // Infrastructure errors
    GatewayUnavailable,
    DatabaseError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::AppointmentNotFound => "APPOINTMENT_NOT_FOUND",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::IntentNotFound => "INTENT_NOT_FOUND",
            ErrorCode::InvalidTransition => "INVALID_TRANSITION",
            ErrorCode::AlreadyPaid => "ALREADY_PAID",
            ErrorCode::SubjectCancelled => "SUBJECT_CANCELLED",
            ErrorCode::PaymentNotRequired => "PAYMENT_NOT_REQUIRED",
            ErrorCode::CheckoutConflict => "CHECKOUT_CONFLICT",
            ErrorCode::ConsistencyViolation => "CONSISTENCY_VIOLATION",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::GatewayUnavailable => "GATEWAY_UNAVAILABLE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with a stable code and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ValidationFailed,
            format!("{}: {}", field.into(), message.into()),
        )
    }

    /// Creates a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Creates an invalid transition error.
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransition, message)
    }

    /// Creates a consistency violation error.
    ///
    /// This class of error is never resolved automatically; it marks a
    /// gateway confirmation that arrived for a subject the application
    /// already closed out and requires manual reconciliation.
    pub fn consistency_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConsistencyViolation, message)
    }

    /// Returns true if a retry of the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::GatewayUnavailable | ErrorCode::DatabaseError
        )
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::new(ErrorCode::ValidationFailed, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::AppointmentNotFound, "no such appointment");
        assert_eq!(format!("{}", err), "APPOINTMENT_NOT_FOUND: no such appointment");
    }

    #[test]
    fn validation_error_converts_to_domain_error() {
        let err: DomainError = ValidationError::empty_field("price").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn gateway_unavailable_is_retryable() {
        let err = DomainError::new(ErrorCode::GatewayUnavailable, "timeout");
        assert!(err.is_retryable());
    }

    #[test]
    fn consistency_violation_is_not_retryable() {
        let err = DomainError::consistency_violation("paid after cancel");
        assert!(!err.is_retryable());
        assert_eq!(err.code, ErrorCode::ConsistencyViolation);
    }
}
