//! Integration tests for the booking and payment reconciliation flow.
//!
//! These tests verify the end-to-end flow:
//! 1. Client starts checkout for a paid appointment or subscription
//! 2. The gateway delivers a signed completion webhook
//! 3. The dispatcher applies the payment exactly once
//! 4. Redeliveries are acknowledged without re-applying
//! 5. Booking transitions preserve settled payment state
//!
//! Uses in-memory implementations to test the flow without external
//! dependencies.

use std::sync::Arc;

use hmac::Mac;

use fitbook::adapters::gateway::MockPaymentGateway;
use fitbook::adapters::memory::{
    InMemoryAppointmentRepository, InMemoryCheckoutIntentRepository, InMemoryEventStore,
    InMemorySubscriptionRepository,
};
use fitbook::application::handlers::billing::{
    BookingAction, HandleGatewayWebhookCommand, HandleGatewayWebhookHandler,
    StartAppointmentCheckoutCommand, StartAppointmentCheckoutHandler,
    StartSubscriptionCheckoutCommand, StartSubscriptionCheckoutHandler,
    UpdateBookingStatusCommand, UpdateBookingStatusHandler,
};
use fitbook::domain::appointment::{Appointment, BookingStatus, PaymentStatus};
use fitbook::domain::billing::{DispatchOutcome, EventDispatcher, IntentStatus, WebhookError, WebhookVerifier};
use fitbook::domain::foundation::{
    AppointmentId, Currency, Money, Timestamp, TrainerId, UserId,
};
use fitbook::domain::subscription::{Plan, SubscriptionStatus};
use fitbook::ports::{
    AppointmentRepository, CheckoutIntentRepository, EventStore, SubscriptionRepository,
};

const WEBHOOK_SECRET: &str = "whsec_integration_test";

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    appointments: Arc<InMemoryAppointmentRepository>,
    subscriptions: Arc<InMemorySubscriptionRepository>,
    intents: Arc<InMemoryCheckoutIntentRepository>,
    event_store: Arc<InMemoryEventStore>,
    gateway: Arc<MockPaymentGateway>,
    webhook: HandleGatewayWebhookHandler,
}

impl TestApp {
    fn new() -> Self {
        let appointments = Arc::new(InMemoryAppointmentRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let event_store = Arc::new(InMemoryEventStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            event_store.clone(),
            appointments.clone(),
            subscriptions.clone(),
            intents.clone(),
        ));
        let webhook = HandleGatewayWebhookHandler::new(
            WebhookVerifier::new(WEBHOOK_SECRET),
            dispatcher,
            false,
        );
        Self {
            appointments,
            subscriptions,
            intents,
            event_store,
            gateway,
            webhook,
        }
    }

    fn appointment_checkout(&self) -> StartAppointmentCheckoutHandler {
        StartAppointmentCheckoutHandler::new(
            self.appointments.clone(),
            self.intents.clone(),
            self.gateway.clone(),
            "https://app.test/billing/success",
            "https://app.test/billing/cancel",
        )
    }

    fn subscription_checkout(&self) -> StartSubscriptionCheckoutHandler {
        StartSubscriptionCheckoutHandler::new(
            self.subscriptions.clone(),
            self.intents.clone(),
            self.gateway.clone(),
            "https://app.test/billing/success",
            "https://app.test/billing/cancel",
        )
    }

    fn booking(&self) -> UpdateBookingStatusHandler {
        UpdateBookingStatusHandler::new(self.appointments.clone())
    }

    async fn deliver(&self, body: &str) -> Result<DispatchOutcome, WebhookError> {
        let signature = sign(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), body.as_bytes());
        self.webhook
            .handle(HandleGatewayWebhookCommand {
                payload: body.as_bytes().to_vec(),
                signature,
            })
            .await
    }

    async fn seed_appointment(&self, price: i64) -> Appointment {
        let appointment = Appointment::schedule(
            AppointmentId::new(),
            UserId::new(),
            TrainerId::new(),
            Timestamp::now().add_days(2),
            Money::from_minor_units(price).unwrap(),
            Currency::usd(),
        );
        self.appointments.save(&appointment).await.unwrap();
        appointment
    }
}

fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let digest = mac.finalize().into_bytes();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("t={},v1={}", timestamp, hex)
}

fn appointment_paid_event(event_id: &str, appointment: &Appointment, intent_id: &str, amount: i64) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "appointment.checkout.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "appointment_id": appointment.id.to_string(),
                "intent_id": intent_id,
                "amount_total": amount
            }
        },
        "livemode": true
    })
    .to_string()
}

// =============================================================================
// Appointment payment flow
// =============================================================================

#[tokio::test]
async fn paid_appointment_checkout_settles_exactly_once() {
    let app = TestApp::new();
    let appointment = app.seed_appointment(5000).await;

    // Client starts checkout and gets redirected to the hosted page.
    let redirect = app
        .appointment_checkout()
        .handle(StartAppointmentCheckoutCommand {
            appointment_id: appointment.id,
            requested_by: appointment.client_id,
        })
        .await
        .unwrap();
    assert!(!redirect.redirect_url.is_empty());

    let pending = app
        .appointments
        .find_by_id(&appointment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.payment_status, PaymentStatus::PendingCheckout);

    // Gateway confirms the payment.
    let body = appointment_paid_event(
        "evt_1",
        &appointment,
        &redirect.intent_id.to_string(),
        5000,
    );
    let outcome = app.deliver(&body).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Applied);

    let paid = app
        .appointments
        .find_by_id(&appointment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let intent = app
        .intents
        .find_by_id(&redirect.intent_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.status, IntentStatus::Completed);

    let record = app.event_store.find("evt_1").await.unwrap().unwrap();
    assert!(record.is_applied());

    // Gateway redelivers the same event; acknowledged, not re-applied.
    let updates_before = app.appointments.update_count();
    let outcome = app.deliver(&body).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Duplicate);
    assert_eq!(app.appointments.update_count(), updates_before);
}

#[tokio::test]
async fn cancelling_a_paid_appointment_preserves_payment_state() {
    let app = TestApp::new();
    let appointment = app.seed_appointment(5000).await;

    let redirect = app
        .appointment_checkout()
        .handle(StartAppointmentCheckoutCommand {
            appointment_id: appointment.id,
            requested_by: appointment.client_id,
        })
        .await
        .unwrap();

    let body = appointment_paid_event(
        "evt_2",
        &appointment,
        &redirect.intent_id.to_string(),
        5000,
    );
    assert_eq!(app.deliver(&body).await.unwrap(), DispatchOutcome::Applied);

    let cancelled = app
        .booking()
        .handle(UpdateBookingStatusCommand {
            appointment_id: appointment.id,
            requested_by: appointment.client_id,
            action: BookingAction::Cancel,
        })
        .await
        .unwrap();

    assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);
    // The payment record survives the booking cancellation.
    assert_eq!(cancelled.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn payment_for_cancelled_appointment_is_flagged() {
    let app = TestApp::new();
    let appointment = app.seed_appointment(5000).await;

    let redirect = app
        .appointment_checkout()
        .handle(StartAppointmentCheckoutCommand {
            appointment_id: appointment.id,
            requested_by: appointment.client_id,
        })
        .await
        .unwrap();

    // Client cancels before the gateway confirms.
    app.booking()
        .handle(UpdateBookingStatusCommand {
            appointment_id: appointment.id,
            requested_by: appointment.client_id,
            action: BookingAction::Cancel,
        })
        .await
        .unwrap();

    let body = appointment_paid_event(
        "evt_3",
        &appointment,
        &redirect.intent_id.to_string(),
        5000,
    );
    let outcome = app.deliver(&body).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Flagged);

    // Flagged events stay visible to operators but stop gateway retries.
    let record = app.event_store.find("evt_3").await.unwrap().unwrap();
    assert!(record.flagged);
    assert!(record.is_applied());
}

// =============================================================================
// Subscription activation flow
// =============================================================================

#[tokio::test]
async fn subscription_checkout_activates_on_webhook() {
    let app = TestApp::new();
    let user_id = UserId::new();

    let redirect = app
        .subscription_checkout()
        .handle(StartSubscriptionCheckoutCommand {
            user_id,
            plan: Plan::Premium,
        })
        .await
        .unwrap();

    let period_end = chrono::Utc::now().timestamp() + 30 * 86_400;
    let body = serde_json::json!({
        "id": "evt_sub_1",
        "type": "subscription.checkout.completed",
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "subscription_id": redirect.subscription_id.to_string(),
                "intent_id": redirect.intent_id.to_string(),
                "period_end": period_end
            }
        },
        "livemode": true
    })
    .to_string();

    assert_eq!(app.deliver(&body).await.unwrap(), DispatchOutcome::Applied);

    let subscription = app
        .subscriptions
        .find_by_id(&redirect.subscription_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert!(subscription.has_access());

    let intent = app
        .intents
        .find_by_id(&redirect.intent_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.status, IntentStatus::Completed);
}

// =============================================================================
// Signature rejection
// =============================================================================

#[tokio::test]
async fn forged_signature_is_rejected_without_side_effects() {
    let app = TestApp::new();
    let appointment = app.seed_appointment(5000).await;

    let body = appointment_paid_event("evt_forged", &appointment, "ignored", 5000);
    let signature = sign("whsec_wrong_secret", chrono::Utc::now().timestamp(), body.as_bytes());

    let err = app
        .webhook
        .handle(HandleGatewayWebhookCommand {
            payload: body.into_bytes(),
            signature,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::InvalidSignature));
    assert!(app.event_store.find("evt_forged").await.unwrap().is_none());
}

#[tokio::test]
async fn stale_signature_is_rejected_even_when_valid() {
    let app = TestApp::new();
    let appointment = app.seed_appointment(5000).await;

    let body = appointment_paid_event("evt_stale", &appointment, "ignored", 5000);
    let stale = chrono::Utc::now().timestamp() - 600;
    let signature = sign(WEBHOOK_SECRET, stale, body.as_bytes());

    let err = app
        .webhook
        .handle(HandleGatewayWebhookCommand {
            payload: body.into_bytes(),
            signature,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, WebhookError::StaleTimestamp));
}

// =============================================================================
// Unknown events
// =============================================================================

#[tokio::test]
async fn unrecognized_event_kind_is_acknowledged_and_ignored() {
    let app = TestApp::new();

    let body = serde_json::json!({
        "id": "evt_unknown",
        "type": "customer.updated",
        "created": chrono::Utc::now().timestamp(),
        "data": { "object": {} },
        "livemode": true
    })
    .to_string();

    assert_eq!(app.deliver(&body).await.unwrap(), DispatchOutcome::Ignored);

    // Recorded as applied so the gateway stops redelivering it.
    let record = app.event_store.find("evt_unknown").await.unwrap().unwrap();
    assert!(record.is_applied());
}
