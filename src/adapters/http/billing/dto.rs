//! HTTP DTOs (Data Transfer Objects) for booking and billing endpoints.
//!
//! These types define the JSON request/response structure for the API.
//! They serve as the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::BookingAction;
use crate::domain::appointment::{Appointment, BookingStatus, PaymentStatus};
use crate::domain::billing::DispatchOutcome;
use crate::domain::subscription::{Plan, Subscription, SubscriptionStatus};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start subscription checkout for a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionCheckoutRequest {
    /// The plan to subscribe to.
    pub plan: Plan,
}

/// Booking action requested over the API.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingActionRequest {
    Cancel,
    Complete,
    NoShow,
}

impl From<BookingActionRequest> for BookingAction {
    fn from(action: BookingActionRequest) -> Self {
        match action {
            BookingActionRequest::Cancel => BookingAction::Cancel,
            BookingActionRequest::Complete => BookingAction::Complete,
            BookingActionRequest::NoShow => BookingAction::NoShow,
        }
    }
}

/// Request to change an appointment's booking status.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub action: BookingActionRequest,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Appointment details for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentResponse {
    pub id: String,
    pub client_id: String,
    pub trainer_id: String,
    /// When the session takes place (ISO 8601).
    pub scheduled_at: String,
    /// Price in minor units.
    pub price: i64,
    pub currency: String,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Checkout intent currently attached, if any.
    pub checkout_intent_id: Option<String>,
}

impl From<&Appointment> for AppointmentResponse {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.to_string(),
            client_id: appointment.client_id.to_string(),
            trainer_id: appointment.trainer_id.to_string(),
            scheduled_at: appointment.scheduled_at.as_datetime().to_rfc3339(),
            price: appointment.price.minor_units(),
            currency: appointment.currency.as_str().to_string(),
            booking_status: appointment.booking_status,
            payment_status: appointment.payment_status,
            checkout_intent_id: appointment.checkout_intent_id.map(|id| id.to_string()),
        }
    }
}

/// Subscription access details.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionAccessResponse {
    /// Whether the user currently has plan access.
    pub has_access: bool,
    /// The plan of the active subscription, if one exists.
    pub plan: Option<Plan>,
    pub status: Option<SubscriptionStatus>,
    /// End of the paid-for period (ISO 8601).
    pub period_end: Option<String>,
}

impl SubscriptionAccessResponse {
    pub fn none() -> Self {
        Self {
            has_access: false,
            plan: None,
            status: None,
            period_end: None,
        }
    }
}

impl From<&Subscription> for SubscriptionAccessResponse {
    fn from(subscription: &Subscription) -> Self {
        Self {
            has_access: subscription.has_access(),
            plan: Some(subscription.plan),
            status: Some(subscription.status),
            period_end: subscription
                .current_period_end
                .map(|end| end.as_datetime().to_rfc3339()),
        }
    }
}

/// Response for checkout initiation.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// The checkout intent backing this session.
    pub intent_id: String,
    /// Hosted checkout page to redirect the client to.
    pub checkout_url: String,
    /// Set when checkout created a new pending subscription.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

/// Acknowledgement returned to the gateway for a processed webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// What the dispatcher did with the event.
    pub outcome: &'static str,
}

impl WebhookAckResponse {
    pub fn from_outcome(outcome: DispatchOutcome) -> Self {
        let outcome = match outcome {
            DispatchOutcome::Applied => "applied",
            DispatchOutcome::Duplicate => "duplicate",
            DispatchOutcome::Ignored => "ignored",
            DispatchOutcome::Flagged => "flagged",
        };
        Self {
            received: true,
            outcome,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
