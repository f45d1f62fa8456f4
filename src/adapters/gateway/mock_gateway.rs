//! Mock payment gateway for testing.
//!
//! Scriptable implementation of `PaymentGateway`: configure the next
//! session or error, and assert on how many sessions were requested.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{
    CheckoutSessionRequest, GatewayError, HostedCheckoutSession, PaymentGateway,
};

#[derive(Default)]
struct MockState {
    next_session: Option<HostedCheckoutSession>,
    next_error: Option<GatewayError>,
    requests: Vec<CheckoutSessionRequest>,
}

/// Mock gateway for tests.
#[derive(Default)]
pub struct MockPaymentGateway {
    state: Mutex<MockState>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that fails every session request as unavailable.
    pub fn unavailable() -> Self {
        let mock = Self::new();
        mock.set_error(GatewayError::Unavailable("mock gateway down".into()));
        mock
    }

    /// Set the session to return on the next call.
    pub fn set_session(&self, session: HostedCheckoutSession) {
        self.state.lock().unwrap().next_session = Some(session);
    }

    /// Set an error to return on every call until cleared.
    pub fn set_error(&self, error: GatewayError) {
        self.state.lock().unwrap().next_error = Some(error);
    }

    /// Clear a configured error.
    pub fn clear_error(&self) {
        self.state.lock().unwrap().next_error = None;
    }

    /// Number of session requests received.
    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// All session requests received, in order.
    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<HostedCheckoutSession, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if let Some(error) = state.next_error.clone() {
            return Err(error);
        }

        Ok(state.next_session.take().unwrap_or_else(|| {
            let id = format!("cs_mock_{}", uuid::Uuid::new_v4().simple());
            HostedCheckoutSession {
                redirect_url: format!("https://pay.gateway.test/c/{id}"),
                session_id: id,
            }
        }))
    }
}
