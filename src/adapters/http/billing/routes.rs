//! Axum router configuration for booking and billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    check_subscription_access, get_appointment, handle_gateway_webhook,
    start_appointment_checkout, start_subscription_checkout, update_booking_status,
    BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `GET /appointments/:id` - Get appointment details
/// - `POST /appointments/:id/checkout` - Start appointment checkout
/// - `POST /appointments/:id/status` - Cancel/complete/no-show a booking
/// - `POST /subscriptions/checkout` - Start subscription checkout
/// - `GET /subscriptions/access` - Check current plan access
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/appointments/:id", get(get_appointment))
        .route("/appointments/:id/checkout", post(start_appointment_checkout))
        .route("/appointments/:id/status", post(update_booking_status))
        .route("/subscriptions/checkout", post(start_subscription_checkout))
        .route("/subscriptions/access", get(check_subscription_access))
}

/// Create the gateway webhook router.
///
/// Separate from the billing routes because webhooks carry no user
/// authentication; they are verified via signature.
///
/// # Routes
/// - `POST /gateway` - Handle payment gateway webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/gateway", post(handle_gateway_webhook))
}

/// Create the complete billing module router.
///
/// Combines user routes and webhook routes into a single router suitable
/// for mounting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryAppointmentRepository, InMemoryCheckoutIntentRepository, InMemoryEventStore,
        InMemorySubscriptionRepository,
    };
    use crate::application::handlers::billing::HandleGatewayWebhookHandler;
    use crate::domain::billing::{EventDispatcher, WebhookVerifier};

    fn test_state() -> BillingAppState {
        let appointments = Arc::new(InMemoryAppointmentRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let event_store = Arc::new(InMemoryEventStore::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            event_store,
            appointments.clone(),
            subscriptions.clone(),
            intents.clone(),
        ));
        BillingAppState {
            appointments,
            subscriptions,
            intents,
            gateway: Arc::new(MockPaymentGateway::new()),
            webhook: Arc::new(HandleGatewayWebhookHandler::new(
                WebhookVerifier::new("whsec_test"),
                dispatcher,
                false,
            )),
            checkout_success_url: "https://app.test/success".to_string(),
            checkout_cancel_url: "https://app.test/cancel".to_string(),
        }
    }

    #[test]
    fn billing_routes_creates_router() {
        let router = billing_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn webhook_routes_creates_router() {
        let router = webhook_routes();
        let _: Router<()> = router.with_state(test_state());
    }

    #[test]
    fn billing_router_creates_combined_router() {
        let router = billing_router();
        let _: Router<()> = router.with_state(test_state());
    }
}
