//! Billing domain module.
//!
//! The reconciliation core: checkout intents, the gateway event envelope,
//! webhook signature verification, and the idempotent event dispatcher that
//! ties the gateway's event stream to the appointment and subscription
//! state machines.

mod dispatcher;
mod errors;
mod gateway_event;
mod intent;
mod signature;

pub use dispatcher::{DispatchOutcome, EventDispatcher, SubjectLocks};
pub use errors::WebhookError;
pub use gateway_event::{
    payload_hash, AppointmentCheckoutPayload, GatewayEvent, GatewayEventKind,
    SubscriptionCheckoutPayload, SubscriptionEventPayload,
};
pub use intent::{CheckoutIntent, IntentStatus, SubjectRef, SubjectType};
pub use signature::{SignatureHeader, WebhookVerifier};
