//! Gateway webhook event types.
//!
//! Defines the envelope for parsing gateway webhook payloads and the closed
//! set of event kinds the dispatcher routes on. Only fields relevant to
//! reconciliation are captured.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::foundation::IntentId;

/// Gateway webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "appointment.checkout.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: GatewayEventData,

    /// Whether this is a live mode event (vs test mode).
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEventData {
    /// The object that triggered the event (shape depends on event type).
    pub object: serde_json::Value,
}

impl GatewayEvent {
    /// Parse the event type into a known enum variant.
    pub fn kind(&self) -> GatewayEventKind {
        GatewayEventKind::from_type_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Known gateway event kinds.
///
/// A closed enum with an explicit `Unrecognized` variant: the dispatcher
/// acknowledges kinds it does not understand so the gateway stops retrying,
/// and the compiler enforces exhaustive handling of the ones it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEventKind {
    /// Checkout completed for an appointment.
    AppointmentCheckoutCompleted,
    /// Checkout failed for an appointment.
    AppointmentCheckoutFailed,
    /// Checkout completed for a subscription plan selection.
    SubscriptionCheckoutCompleted,
    /// A renewal invoice failed to collect.
    InvoicePaymentFailed,
    /// The gateway cancelled the subscription upstream.
    SubscriptionCancelledUpstream,
    /// Valid event of a type this engine does not act on.
    Unrecognized,
}

impl GatewayEventKind {
    /// Parse an event kind from the gateway's type string.
    pub fn from_type_str(s: &str) -> Self {
        match s {
            "appointment.checkout.completed" => Self::AppointmentCheckoutCompleted,
            "appointment.checkout.failed" => Self::AppointmentCheckoutFailed,
            "subscription.checkout.completed" => Self::SubscriptionCheckoutCompleted,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "subscription.cancelled" => Self::SubscriptionCancelledUpstream,
            _ => Self::Unrecognized,
        }
    }

    /// The gateway's type string for this kind.
    pub fn as_type_str(&self) -> &'static str {
        match self {
            Self::AppointmentCheckoutCompleted => "appointment.checkout.completed",
            Self::AppointmentCheckoutFailed => "appointment.checkout.failed",
            Self::SubscriptionCheckoutCompleted => "subscription.checkout.completed",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::SubscriptionCancelledUpstream => "subscription.cancelled",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Data object for appointment checkout outcomes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppointmentCheckoutPayload {
    /// The appointment the checkout session was scoped to.
    pub appointment_id: Uuid,

    /// The local intent echoed back from session metadata.
    pub intent_id: IntentId,

    /// Amount captured, in minor units.
    pub amount_total: i64,
}

/// Data object for subscription checkout completion.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionCheckoutPayload {
    /// The subscription the checkout session was scoped to.
    pub subscription_id: Uuid,

    /// The local intent echoed back from session metadata.
    pub intent_id: IntentId,

    /// End of the paid-for period (Unix timestamp).
    pub period_end: i64,
}

/// Data object for subscription lifecycle events originating upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionEventPayload {
    /// The affected subscription.
    pub subscription_id: Uuid,
}

/// SHA-256 hex digest of a raw webhook payload, stored for auditing.
pub fn payload_hash(raw: &[u8]) -> String {
    let digest = Sha256::digest(raw);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
