//! HandleGatewayWebhookHandler - verify, then dispatch.
//!
//! The only path from raw gateway bytes to a domain mutation. Verification
//! failures stop here; nothing unverified ever reaches the dispatcher.

use std::sync::Arc;

use crate::domain::billing::{
    payload_hash, DispatchOutcome, EventDispatcher, WebhookError, WebhookVerifier,
};

/// Command carrying a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    /// Raw request body, exactly as received. The signature covers these
    /// bytes; re-serialization would break verification.
    pub payload: Vec<u8>,
    /// Value of the gateway signature header.
    pub signature: String,
}

pub struct HandleGatewayWebhookHandler {
    verifier: WebhookVerifier,
    dispatcher: Arc<EventDispatcher>,
    /// Reject test-mode events when running against live traffic.
    require_livemode: bool,
}

impl HandleGatewayWebhookHandler {
    pub fn new(
        verifier: WebhookVerifier,
        dispatcher: Arc<EventDispatcher>,
        require_livemode: bool,
    ) -> Self {
        Self {
            verifier,
            dispatcher,
            require_livemode,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleGatewayWebhookCommand,
    ) -> Result<DispatchOutcome, WebhookError> {
        let event = self.verifier.verify(&cmd.payload, &cmd.signature)?;

        if self.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "rejected test mode event");
            return Err(WebhookError::ParseError(
                "test mode events not accepted".to_string(),
            ));
        }

        let hash = payload_hash(&cmd.payload);
        self.dispatcher.dispatch(&event, &hash).await
    }
}
