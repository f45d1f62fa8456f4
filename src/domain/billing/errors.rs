//! Webhook error types for gateway webhook handling.
//!
//! Covers every failure mode between the raw HTTP payload and the domain
//! mutation, with HTTP status mapping and retryability semantics. The
//! status code drives the gateway's retry behavior: 2xx acknowledges, 4xx
//! stops retries, 5xx triggers redelivery with backoff.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors that occur during webhook verification and dispatch.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// HMAC verification failed; the payload was not produced by the
    /// gateway (or was tampered with).
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is older than the tolerance window. Rejected
    /// even with a valid HMAC to bound replay exposure.
    #[error("Stale signature timestamp")]
    StaleTimestamp,

    /// Signature timestamp is in the future beyond clock skew tolerance.
    #[error("Signature timestamp in the future")]
    FutureTimestamp,

    /// Failed to parse the signature header or the JSON payload.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the event payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The subject the event refers to could not be found. Retryable:
    /// may be eventual consistency between checkout and delivery.
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    /// The event asked for a transition the subject's state machine
    /// rejects.
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the gateway should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::SubjectNotFound(_)
        )
    }

    /// Maps the error to the HTTP status returned to the gateway.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::StaleTimestamp => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::FutureTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,
            WebhookError::SubjectNotFound(_)
            | WebhookError::InvalidTransition(_)
            | WebhookError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidTransition => WebhookError::InvalidTransition(err.message),
            ErrorCode::AppointmentNotFound
            | ErrorCode::SubscriptionNotFound
            | ErrorCode::IntentNotFound => WebhookError::SubjectNotFound(err.message),
            _ => WebhookError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_map_to_unauthorized() {
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WebhookError::StaleTimestamp.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn parse_failures_map_to_bad_request() {
        assert_eq!(
            WebhookError::ParseError("bad json".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::MissingField("intent_id").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn retryable_failures_map_to_server_error() {
        let err = WebhookError::Database("pool exhausted".into());
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn signature_failures_are_not_retryable() {
        assert!(!WebhookError::InvalidSignature.is_retryable());
        assert!(!WebhookError::StaleTimestamp.is_retryable());
    }

    #[test]
    fn domain_not_found_converts_to_subject_not_found() {
        let err: WebhookError =
            DomainError::new(ErrorCode::AppointmentNotFound, "missing").into();
        assert!(matches!(err, WebhookError::SubjectNotFound(_)));
        assert!(err.is_retryable());
    }
}
