//! Appointment aggregate entity.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: the price is an i64 cent amount, never a float
//! - **Two independent axes**: booking status and payment status progress
//!   separately; the aggregate guards the reachable combinations
//! - **Dispatcher-only payment writes**: `mark_paid`/`mark_failed` are called
//!   from the webhook dispatcher; client-facing code never touches them

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AppointmentId, Currency, DomainError, ErrorCode, IntentId, Money, StateMachine, Timestamp,
    TrainerId, UserId,
};

use super::{BookingStatus, PaymentStatus};

/// Outcome of applying a paid confirmation to an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaidOutcome {
    /// Payment status moved to Paid.
    MarkedPaid,
    /// Appointment was already Paid; the confirmation is a no-op.
    AlreadyPaid,
}

/// Appointment aggregate.
///
/// # Invariants
///
/// - `payment_status == NotRequired` iff `price` is zero
/// - `payment_status` moves to `Paid` only via a verified webhook event
/// - `booking_status == Cancelled` is terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique identifier for this appointment.
    pub id: AppointmentId,

    /// Client who requested the session.
    pub client_id: UserId,

    /// Trainer the session is assigned to.
    pub trainer_id: TrainerId,

    /// When the session takes place.
    pub scheduled_at: Timestamp,

    /// Price in minor units. Zero means no payment is required.
    pub price: Money,

    /// Currency the price is denominated in.
    pub currency: Currency,

    /// Booking side of the lifecycle.
    pub booking_status: BookingStatus,

    /// Payment side of the lifecycle.
    pub payment_status: PaymentStatus,

    /// Checkout intent currently attached to this appointment, if any.
    /// Replaced when checkout is restarted after a failure.
    pub checkout_intent_id: Option<IntentId>,

    /// When the appointment was created.
    pub created_at: Timestamp,

    /// When the appointment was last updated.
    pub updated_at: Timestamp,
}

impl Appointment {
    /// Schedules a new appointment.
    ///
    /// A zero price puts the payment side in `NotRequired`; any positive
    /// price starts in `PendingCheckout` awaiting a checkout session.
    pub fn schedule(
        id: AppointmentId,
        client_id: UserId,
        trainer_id: TrainerId,
        scheduled_at: Timestamp,
        price: Money,
        currency: Currency,
    ) -> Self {
        let now = Timestamp::now();
        let payment_status = if price.is_zero() {
            PaymentStatus::NotRequired
        } else {
            PaymentStatus::PendingCheckout
        };
        Self {
            id,
            client_id,
            trainer_id,
            scheduled_at,
            price,
            currency,
            booking_status: BookingStatus::Scheduled,
            payment_status,
            checkout_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the booking side has reached a terminal state.
    pub fn is_closed(&self) -> bool {
        self.booking_status.is_terminal()
    }

    /// Marks the session as completed.
    ///
    /// Only settled appointments (free or paid) can complete; a priced
    /// session with money still outstanding stays open.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the booking status does not permit
    /// completion or payment is still outstanding.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        if !self.payment_status.is_settled() {
            return Err(DomainError::invalid_transition(
                "cannot complete an appointment with payment outstanding",
            ));
        }
        self.booking_status = self
            .booking_status
            .transition_to(BookingStatus::Completed)?;
        self.touch();
        Ok(())
    }

    /// Cancels the appointment.
    ///
    /// Cancellation is always permitted pre-completion, regardless of the
    /// payment side. An Open checkout intent is deliberately left alone: if
    /// the gateway later confirms payment for this appointment, the
    /// confirmation takes the consistency-violation path instead of
    /// reopening the booking. Refund handling is out of scope.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the appointment is already closed.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.booking_status = self
            .booking_status
            .transition_to(BookingStatus::Cancelled)?;
        self.touch();
        Ok(())
    }

    /// Records that the client did not attend.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the appointment is already closed.
    pub fn mark_no_show(&mut self) -> Result<(), DomainError> {
        self.booking_status = self.booking_status.transition_to(BookingStatus::NoShow)?;
        self.touch();
        Ok(())
    }

    /// Attaches a checkout intent, superseding any previous one.
    ///
    /// Restarting checkout after a failure moves the payment side back to
    /// `PendingCheckout`.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotRequired` for free appointments and
    /// `SubjectCancelled` for closed ones.
    pub fn attach_intent(&mut self, intent_id: IntentId) -> Result<(), DomainError> {
        if self.price.is_zero() {
            return Err(DomainError::new(
                ErrorCode::PaymentNotRequired,
                "free appointments have no checkout",
            ));
        }
        if self.is_closed() {
            return Err(DomainError::new(
                ErrorCode::SubjectCancelled,
                "appointment is no longer open for checkout",
            ));
        }
        if self.payment_status == PaymentStatus::Failed {
            self.payment_status = self
                .payment_status
                .transition_to(PaymentStatus::PendingCheckout)?;
        }
        self.checkout_intent_id = Some(intent_id);
        self.touch();
        Ok(())
    }

    /// Applies a verified paid confirmation from the gateway.
    ///
    /// Idempotent when already Paid. A confirmation arriving for an
    /// appointment the platform already closed out (cancelled or completed
    /// while unpaid) is a consistency violation: the gateway captured money
    /// for a booking that no longer expects it.
    ///
    /// # Errors
    ///
    /// - `ConsistencyViolation` for closed-out or free appointments, or an
    ///   amount that does not match the price
    /// - `InvalidTransition` if the payment state machine rejects the move
    pub fn mark_paid(&mut self, amount: Money) -> Result<MarkPaidOutcome, DomainError> {
        if self.payment_status == PaymentStatus::Paid {
            return Ok(MarkPaidOutcome::AlreadyPaid);
        }
        if self.is_closed() {
            return Err(DomainError::consistency_violation(format!(
                "gateway confirmed payment for appointment {} already {:?}",
                self.id, self.booking_status
            )));
        }
        if self.payment_status == PaymentStatus::NotRequired {
            return Err(DomainError::consistency_violation(format!(
                "gateway confirmed payment for free appointment {}",
                self.id
            )));
        }
        if amount != self.price {
            return Err(DomainError::consistency_violation(format!(
                "gateway confirmed {} but appointment {} is priced at {}",
                amount, self.id, self.price
            )));
        }
        self.payment_status = self.payment_status.transition_to(PaymentStatus::Paid)?;
        self.touch();
        Ok(MarkPaidOutcome::MarkedPaid)
    }

    /// Applies a verified failed confirmation from the gateway.
    ///
    /// Idempotent when already Failed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the payment side is not pending.
    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        if self.payment_status == PaymentStatus::Failed {
            return Ok(());
        }
        self.payment_status = self.payment_status.transition_to(PaymentStatus::Failed)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
