//! Payment gateway configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment gateway configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Gateway API key
    pub gateway_api_key: String,

    /// Gateway webhook signing secret
    pub gateway_webhook_secret: String,

    /// Gateway API base URL
    #[serde(default = "default_api_base_url")]
    pub gateway_api_base_url: String,

    /// Gateway request timeout in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// URL the client lands on after a successful checkout
    pub checkout_success_url: String,

    /// URL the client lands on after abandoning checkout
    pub checkout_cancel_url: String,

    /// Reject test-mode webhook events
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Check if using gateway test mode
    pub fn is_test_mode(&self) -> bool {
        self.gateway_api_key.starts_with("sk_test_")
    }

    /// Check if using gateway live mode
    pub fn is_live_mode(&self) -> bool {
        self.gateway_api_key.starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.gateway_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_API_KEY"));
        }
        if self.gateway_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.gateway_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidGatewayKey);
        }
        if !self.gateway_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        for url in [&self.checkout_success_url, &self.checkout_cancel_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidRedirectUrl);
            }
        }

        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.paygate.example.com".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}
