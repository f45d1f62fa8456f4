//! Gateway webhook signature verification.
//!
//! Verifies that an inbound webhook payload was produced by the payment
//! gateway, using HMAC-SHA256 over the raw request body with a timestamped
//! signature header. Timestamp validation bounds replay-attack exposure.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::gateway_event::GatewayEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed age for webhook signatures (5 minutes).
const MAX_SIGNATURE_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future timestamps (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the gateway signature header.
///
/// Format: `t=<unix-timestamp>,v1=<hex-hmac>`. Unknown fields are ignored
/// for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// HMAC-SHA256 signature bytes.
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a gateway signature header string.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signature = Some(hex_decode(value).ok_or_else(|| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        let v1_signature = v1_signature
            .ok_or_else(|| WebhookError::ParseError("missing v1 signature".to_string()))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Verifier for gateway webhook signatures.
///
/// Pure over its inputs plus the clock: verification performs no side
/// effects, and a failed verification must prevent the event from ever
/// reaching the dispatcher.
pub struct WebhookVerifier {
    /// The webhook signing secret shared with the gateway. Held in
    /// `SecretString` so it never appears in debug output or logs.
    secret: SecretString,
}

impl WebhookVerifier {
    /// Creates a new verifier with the given signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
        }
    }

    /// Verifies the webhook signature and parses the event envelope.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate the timestamp is within the tolerance window
    /// 3. Compute the expected HMAC over `"<timestamp>.<raw body>"`
    /// 4. Compare signatures in constant time
    /// 5. Parse the JSON payload into a GatewayEvent
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - HMAC mismatch
    /// - `StaleTimestamp` - signature older than 5 minutes
    /// - `FutureTimestamp` - timestamp beyond clock skew tolerance
    /// - `ParseError` - malformed header or JSON payload
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<GatewayEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp)?;

        let expected = self.compute_signature(header.timestamp, payload);
        if !constant_time_compare(&expected, &header.v1_signature) {
            return Err(WebhookError::InvalidSignature);
        }

        let event: GatewayEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(event)
    }

    fn validate_timestamp(&self, timestamp: i64) -> Result<(), WebhookError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > MAX_SIGNATURE_AGE_SECS {
            return Err(WebhookError::StaleTimestamp);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::FutureTimestamp);
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// Prevents timing attacks that could leak the expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Computes a valid signature header for test fixtures.
#[cfg(test)]
pub fn sign_for_tests(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex_encode(&mac.finalize().into_bytes()))
}
