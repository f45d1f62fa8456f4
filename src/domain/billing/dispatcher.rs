//! Event dispatcher - routes verified gateway events to domain mutations.
//!
//! The dispatcher is the only writer on the payment side of both aggregates.
//! Every event passes the idempotency gate first: the event store's atomic
//! insert-if-absent decides whether this delivery applies, reattempts, or
//! acknowledges a duplicate. Per-subject locks serialize concurrent
//! deliveries touching the same appointment or the same user's
//! subscriptions, so read-validate-write sequences never interleave.
//!
//! Outcome contract with the webhook endpoint: `Ok(_)` acknowledges (2xx,
//! gateway stops redelivering), `Err(_)` maps to a status via
//! `WebhookError::status_code` and retryable errors leave the stored record
//! in received so redelivery or the reconciliation sweep picks it up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::domain::appointment::MarkPaidOutcome;
use crate::domain::foundation::{
    AppointmentId, ErrorCode, Money, SubscriptionId, Timestamp, UserId,
};
use crate::domain::subscription::ActivateOutcome;
use crate::ports::{
    AppointmentRepository, CheckoutIntentRepository, EventStore, InsertOutcome,
    PaymentEventRecord, SubscriptionRepository,
};

use super::errors::WebhookError;
use super::gateway_event::{
    AppointmentCheckoutPayload, GatewayEvent, GatewayEventKind, SubscriptionCheckoutPayload,
    SubscriptionEventPayload,
};
use super::intent::{IntentStatus, SubjectType};

/// How a dispatched event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The domain mutation ran and the record was marked applied.
    Applied,
    /// This gateway event id was already applied; nothing changed.
    Duplicate,
    /// The event was acknowledged without a mutation (unrecognized kind,
    /// or a state the subject had already reached).
    Ignored,
    /// The event contradicted local state; it was flagged for manual
    /// reconciliation and acknowledged so the gateway stops retrying.
    Flagged,
}

/// Per-subject mutual exclusion for dispatch critical sections.
///
/// Appointment events lock on the appointment id. Subscription events lock
/// on the owning user id, so single-active-per-user enforcement and
/// activation happen under one guard.
#[derive(Default)]
pub struct SubjectLocks {
    inner: Mutex<HashMap<(SubjectType, Uuid), Arc<tokio::sync::Mutex<()>>>>,
}

impl SubjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, subject_type: SubjectType, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("subject lock map poisoned");
            // A strong count of 1 means the map holds the only reference:
            // no dispatch is waiting on or holding that entry.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                map.entry((subject_type, id))
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

/// Routes verified gateway events to the appointment and subscription
/// state machines, with idempotency and consistency-violation handling.
pub struct EventDispatcher {
    event_store: Arc<dyn EventStore>,
    appointments: Arc<dyn AppointmentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    intents: Arc<dyn CheckoutIntentRepository>,
    locks: SubjectLocks,
}

impl EventDispatcher {
    pub fn new(
        event_store: Arc<dyn EventStore>,
        appointments: Arc<dyn AppointmentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        intents: Arc<dyn CheckoutIntentRepository>,
    ) -> Self {
        Self {
            event_store,
            appointments,
            subscriptions,
            intents,
            locks: SubjectLocks::new(),
        }
    }

    /// Dispatches a verified event.
    ///
    /// The caller has already verified the signature; no unverified payload
    /// reaches this method. `payload_hash` is the SHA-256 digest of the raw
    /// body, stored on the event record for auditing.
    pub async fn dispatch(
        &self,
        event: &GatewayEvent,
        payload_hash: &str,
    ) -> Result<DispatchOutcome, WebhookError> {
        let record =
            PaymentEventRecord::received(&event.id, &event.event_type, payload_hash);

        match self.event_store.insert_received(record).await? {
            InsertOutcome::Inserted => {}
            InsertOutcome::AlreadyExists => {
                let existing = self
                    .event_store
                    .find(&event.id)
                    .await?
                    .ok_or_else(|| WebhookError::Database("event record vanished".into()))?;
                if existing.is_applied() {
                    tracing::debug!(event_id = %event.id, "duplicate delivery, already applied");
                    return Ok(DispatchOutcome::Duplicate);
                }
                // Received but never applied: a redelivery of an event whose
                // first attempt failed mid-flight. Reattempt it.
                tracing::info!(event_id = %event.id, "reattempting unapplied event");
            }
        }

        match event.kind() {
            GatewayEventKind::AppointmentCheckoutCompleted => {
                self.apply_appointment_paid(event).await
            }
            GatewayEventKind::AppointmentCheckoutFailed => {
                self.apply_appointment_failed(event).await
            }
            GatewayEventKind::SubscriptionCheckoutCompleted => {
                self.apply_subscription_activated(event).await
            }
            GatewayEventKind::InvoicePaymentFailed => self.apply_invoice_failed(event).await,
            GatewayEventKind::SubscriptionCancelledUpstream => {
                self.apply_subscription_cancelled(event).await
            }
            GatewayEventKind::Unrecognized => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "acknowledging unrecognized event type"
                );
                self.event_store.mark_applied(&event.id).await?;
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    async fn apply_appointment_paid(
        &self,
        event: &GatewayEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let payload: AppointmentCheckoutPayload = parse_object(event)?;
        let amount = Money::from_minor_units(payload.amount_total)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        let appointment_id = AppointmentId::from_uuid(payload.appointment_id);

        let _guard = self
            .locks
            .acquire(SubjectType::Appointment, payload.appointment_id)
            .await;

        let mut appointment = self
            .appointments
            .find_by_id(&appointment_id)
            .await?
            .ok_or_else(|| {
                WebhookError::SubjectNotFound(format!("appointment {appointment_id}"))
            })?;

        match appointment.mark_paid(amount) {
            Ok(MarkPaidOutcome::MarkedPaid) => {
                self.appointments.update(&appointment).await?;
                self.complete_intent(&payload.intent_id).await?;
                self.event_store.mark_applied(&event.id).await?;
                tracing::info!(
                    event_id = %event.id,
                    appointment_id = %appointment_id,
                    "appointment marked paid"
                );
                Ok(DispatchOutcome::Applied)
            }
            Ok(MarkPaidOutcome::AlreadyPaid) => {
                // A prior attempt may have written the aggregate and died
                // before touching the intent; redelivery finishes the job.
                self.complete_intent(&payload.intent_id).await?;
                self.event_store.mark_applied(&event.id).await?;
                Ok(DispatchOutcome::Ignored)
            }
            Err(err) if err.code == ErrorCode::ConsistencyViolation => {
                self.flag(event, &err.message).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_appointment_failed(
        &self,
        event: &GatewayEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let payload: AppointmentCheckoutPayload = parse_object(event)?;
        let appointment_id = AppointmentId::from_uuid(payload.appointment_id);

        let _guard = self
            .locks
            .acquire(SubjectType::Appointment, payload.appointment_id)
            .await;

        let mut appointment = self
            .appointments
            .find_by_id(&appointment_id)
            .await?
            .ok_or_else(|| {
                WebhookError::SubjectNotFound(format!("appointment {appointment_id}"))
            })?;

        match appointment.mark_failed() {
            Ok(()) => {
                self.appointments.update(&appointment).await?;
                self.expire_intent(&payload.intent_id).await?;
                self.event_store.mark_applied(&event.id).await?;
                tracing::info!(
                    event_id = %event.id,
                    appointment_id = %appointment_id,
                    "appointment checkout failed"
                );
                Ok(DispatchOutcome::Applied)
            }
            // Failure notice for a payment no longer pending (paid or free):
            // out-of-order delivery, acknowledge without touching state.
            Err(err) if err.code == ErrorCode::InvalidTransition => {
                self.event_store.mark_applied(&event.id).await?;
                Ok(DispatchOutcome::Ignored)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_subscription_activated(
        &self,
        event: &GatewayEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let payload: SubscriptionCheckoutPayload = parse_object(event)?;
        let period_end = Timestamp::from_unix(payload.period_end)
            .ok_or(WebhookError::MissingField("period_end"))?;
        let subscription_id = SubscriptionId::from_uuid(payload.subscription_id);

        let user_id = self.subscription_owner(&subscription_id).await?;
        let _guard = self
            .locks
            .acquire(SubjectType::Subscription, *user_id.as_uuid())
            .await;

        // Re-read under the lock; another delivery may have won the race.
        let mut subscription = self
            .subscriptions
            .find_by_id(&subscription_id)
            .await?
            .ok_or_else(|| {
                WebhookError::SubjectNotFound(format!("subscription {subscription_id}"))
            })?;

        match subscription.activate(period_end) {
            Ok(ActivateOutcome::Activated) => {
                // Plan change: any other Active subscription for this user
                // yields to the one just paid for.
                if let Some(mut other) =
                    self.subscriptions.find_active_by_user_id(&user_id).await?
                {
                    if other.id != subscription.id {
                        other.cancel().map_err(WebhookError::from)?;
                        self.subscriptions.update(&other).await?;
                        tracing::info!(
                            superseded = %other.id,
                            activated = %subscription.id,
                            "cancelled prior active subscription on plan change"
                        );
                    }
                }
                self.subscriptions.update(&subscription).await?;
                self.complete_intent(&payload.intent_id).await?;
                self.event_store.mark_applied(&event.id).await?;
                tracing::info!(
                    event_id = %event.id,
                    subscription_id = %subscription_id,
                    "subscription activated"
                );
                Ok(DispatchOutcome::Applied)
            }
            Ok(ActivateOutcome::AlreadyActive) => {
                // A prior attempt may have activated the record and died
                // before touching the intent; redelivery finishes the job.
                self.complete_intent(&payload.intent_id).await?;
                self.event_store.mark_applied(&event.id).await?;
                Ok(DispatchOutcome::Ignored)
            }
            // Confirmation for a subscription cancelled locally: money was
            // captured for a record that no longer expects it.
            Err(err) if err.code == ErrorCode::InvalidTransition => {
                self.flag(
                    event,
                    &format!(
                        "gateway confirmed checkout for cancelled subscription {subscription_id}"
                    ),
                )
                .await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_invoice_failed(
        &self,
        event: &GatewayEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let payload: SubscriptionEventPayload = parse_object(event)?;
        let subscription_id = SubscriptionId::from_uuid(payload.subscription_id);

        let user_id = self.subscription_owner(&subscription_id).await?;
        let _guard = self
            .locks
            .acquire(SubjectType::Subscription, *user_id.as_uuid())
            .await;

        let mut subscription = self
            .subscriptions
            .find_by_id(&subscription_id)
            .await?
            .ok_or_else(|| {
                WebhookError::SubjectNotFound(format!("subscription {subscription_id}"))
            })?;

        match subscription.mark_past_due() {
            Ok(()) => {
                self.subscriptions.update(&subscription).await?;
                self.event_store.mark_applied(&event.id).await?;
                tracing::warn!(
                    event_id = %event.id,
                    subscription_id = %subscription_id,
                    "renewal payment failed, subscription past due"
                );
                Ok(DispatchOutcome::Applied)
            }
            // Not Active: either already past due, already cancelled, or an
            // out-of-order failure for a recovered subscription.
            Err(err) if err.code == ErrorCode::InvalidTransition => {
                self.event_store.mark_applied(&event.id).await?;
                Ok(DispatchOutcome::Ignored)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn apply_subscription_cancelled(
        &self,
        event: &GatewayEvent,
    ) -> Result<DispatchOutcome, WebhookError> {
        let payload: SubscriptionEventPayload = parse_object(event)?;
        let subscription_id = SubscriptionId::from_uuid(payload.subscription_id);

        let user_id = self.subscription_owner(&subscription_id).await?;
        let _guard = self
            .locks
            .acquire(SubjectType::Subscription, *user_id.as_uuid())
            .await;

        let mut subscription = self
            .subscriptions
            .find_by_id(&subscription_id)
            .await?
            .ok_or_else(|| {
                WebhookError::SubjectNotFound(format!("subscription {subscription_id}"))
            })?;

        match subscription.cancel() {
            Ok(()) => {
                self.subscriptions.update(&subscription).await?;
                self.event_store.mark_applied(&event.id).await?;
                tracing::info!(
                    event_id = %event.id,
                    subscription_id = %subscription_id,
                    "subscription cancelled upstream"
                );
                Ok(DispatchOutcome::Applied)
            }
            // Already cancelled, nothing left to do.
            Err(err) if err.code == ErrorCode::InvalidTransition => {
                self.event_store.mark_applied(&event.id).await?;
                Ok(DispatchOutcome::Ignored)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn subscription_owner(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<UserId, WebhookError> {
        self.subscriptions
            .find_by_id(subscription_id)
            .await?
            .map(|sub| sub.user_id)
            .ok_or_else(|| {
                WebhookError::SubjectNotFound(format!("subscription {subscription_id}"))
            })
    }

    async fn complete_intent(
        &self,
        intent_id: &crate::domain::foundation::IntentId,
    ) -> Result<(), WebhookError> {
        if let Some(mut intent) = self.intents.find_by_id(intent_id).await? {
            if intent.status == IntentStatus::Open {
                intent.complete().map_err(WebhookError::from)?;
                self.intents.update(&intent).await?;
            }
        }
        Ok(())
    }

    async fn expire_intent(
        &self,
        intent_id: &crate::domain::foundation::IntentId,
    ) -> Result<(), WebhookError> {
        if let Some(mut intent) = self.intents.find_by_id(intent_id).await? {
            if intent.status == IntentStatus::Open {
                intent.expire().map_err(WebhookError::from)?;
                self.intents.update(&intent).await?;
            }
        }
        Ok(())
    }

    async fn flag(
        &self,
        event: &GatewayEvent,
        reason: &str,
    ) -> Result<DispatchOutcome, WebhookError> {
        tracing::error!(
            event_id = %event.id,
            event_type = %event.event_type,
            reason,
            "consistency violation, flagging event for manual reconciliation"
        );
        self.event_store.flag(&event.id, reason).await?;
        Ok(DispatchOutcome::Flagged)
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(
    event: &GatewayEvent,
) -> Result<T, WebhookError> {
    event
        .deserialize_object()
        .map_err(|e| WebhookError::ParseError(format!("event {}: {}", event.id, e)))
}
