//! HTTP payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the gateway's REST API.
//! The intent id and subject ride along as session metadata so the
//! completion webhook can be correlated back to the local intent.
//!
//! # Security
//!
//! - API key held in `secrecy::SecretString`, sent via basic auth
//! - Every request is bounded by a client-level timeout; a hung gateway
//!   surfaces as `GatewayError::Unavailable`, never a stuck handler

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::SubjectType;
use crate::ports::{
    CheckoutSessionRequest, GatewayError, HostedCheckoutSession, PaymentGateway,
};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Gateway API configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Gateway secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the gateway API.
    api_base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: api_base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Reqwest-backed gateway client.
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client construction only fails on TLS backend misconfiguration");
        Self {
            config,
            http_client,
        }
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<HostedCheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let subject_kind = match request.subject.subject_type {
            SubjectType::Appointment => "appointment",
            SubjectType::Subscription => "subscription",
        };
        let params = [
            ("mode", "payment".to_string()),
            ("amount", request.amount.minor_units().to_string()),
            ("currency", request.currency.as_str().to_lowercase()),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
            ("metadata[intent_id]", request.intent_id.to_string()),
            ("metadata[subject_type]", subject_kind.to_string()),
            (
                "metadata[subject_id]",
                request.subject.subject_id.to_string(),
            ),
        ];

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "gateway request failed");
                GatewayError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "gateway returned server error");
            return Err(GatewayError::Unavailable(format!(
                "gateway responded {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "gateway rejected session request");
            return Err(GatewayError::Rejected(format!(
                "gateway responded {status}: {body}"
            )));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Rejected(format!("malformed session response: {e}")))?;

        Ok(HostedCheckoutSession {
            session_id: session.id,
            redirect_url: session.url,
        })
    }
}
