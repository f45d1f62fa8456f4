//! Payment gateway port for hosted checkout.
//!
//! The gateway owns the checkout UI, card handling, and fraud scoring; this
//! port only mints hosted sessions. Payment outcomes come back through the
//! webhook channel, never through this interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::billing::SubjectRef;
use crate::domain::foundation::{Currency, DomainError, ErrorCode, IntentId, Money};

/// Errors from the gateway client.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway could not be reached, timed out, or returned a 5xx.
    /// Safe to retry; no local state should have been created.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway rejected the request (bad key, malformed session).
    #[error("Gateway rejected request: {0}")]
    Rejected(String),
}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => {
                DomainError::new(ErrorCode::GatewayUnavailable, msg)
            }
            GatewayError::Rejected(msg) => DomainError::new(ErrorCode::InternalError, msg),
        }
    }
}

/// Request to mint a hosted checkout session scoped to one intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    /// Local intent the session is correlated with; echoed back in the
    /// gateway's completion webhook.
    pub intent_id: IntentId,

    /// The appointment or subscription being paid for.
    pub subject: SubjectRef,

    /// Amount to collect, in minor units.
    pub amount: Money,

    /// Currency of the amount.
    pub currency: Currency,

    /// Where the gateway sends the browser after success.
    pub success_url: String,

    /// Where the gateway sends the browser if the user abandons checkout.
    pub cancel_url: String,
}

/// Hosted checkout session minted by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedCheckoutSession {
    /// The gateway's session id, stored on the intent for correlation.
    pub session_id: String,

    /// URL the client browser is redirected to.
    pub redirect_url: String,
}

/// Port for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    ///
    /// Implementations must bound this call with a timeout and surface
    /// `GatewayError::Unavailable` instead of hanging.
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<HostedCheckoutSession, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_maps_to_retryable_domain_error() {
        let err: DomainError = GatewayError::Unavailable("timeout".into()).into();
        assert_eq!(err.code, ErrorCode::GatewayUnavailable);
        assert!(err.is_retryable());
    }

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gw: &dyn PaymentGateway) {}
    }
}
