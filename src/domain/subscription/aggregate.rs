//! Subscription aggregate entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, StateMachine, SubscriptionId, Timestamp, UserId};

use super::{Plan, SubscriptionStatus};

/// Outcome of applying an activation confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivateOutcome {
    /// Status moved to Active (or the period was extended).
    Activated,
    /// Already Active with the same or a later period end; no-op.
    AlreadyActive,
}

/// Subscription aggregate - a user's plan selection and its billing status.
///
/// # Invariants
///
/// - Status transitions follow the state machine rules
/// - Only one subscription per user may be Active at a time; the
///   repository/activation path enforces this across records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// Selected plan.
    pub plan: Plan,

    /// Current billing status.
    pub status: SubscriptionStatus,

    /// End of the paid-for period; gates feature access. Unset until the
    /// first activation.
    pub current_period_end: Option<Timestamp>,

    /// When the subscription was created.
    pub created_at: Timestamp,

    /// When the subscription was last updated.
    pub updated_at: Timestamp,

    /// When the subscription was cancelled (if cancelled).
    pub cancelled_at: Option<Timestamp>,
}

impl Subscription {
    /// Creates a new subscription awaiting its first payment.
    pub fn create_pending(id: SubscriptionId, user_id: UserId, plan: Plan) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id,
            plan,
            status: SubscriptionStatus::Pending,
            current_period_end: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    /// Returns true if this subscription currently grants feature access.
    ///
    /// PastDue keeps access as a grace window; revocation only happens when
    /// the gateway cancels the subscription upstream.
    pub fn has_access(&self) -> bool {
        match self.status {
            SubscriptionStatus::Pending | SubscriptionStatus::Cancelled => false,
            SubscriptionStatus::PastDue => true,
            SubscriptionStatus::Active => self
                .current_period_end
                .is_some_and(|end| Timestamp::now() <= end),
        }
    }

    /// Activates the subscription after a payment confirmation.
    ///
    /// Idempotent: if already Active with the same or a later period end,
    /// nothing changes. Used both for first activation and for renewals /
    /// past-due recovery.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the subscription is Cancelled.
    pub fn activate(&mut self, period_end: Timestamp) -> Result<ActivateOutcome, DomainError> {
        if self.status == SubscriptionStatus::Active {
            if let Some(current) = self.current_period_end {
                if current >= period_end {
                    return Ok(ActivateOutcome::AlreadyActive);
                }
            }
        }
        self.status = self.status.transition_to(SubscriptionStatus::Active)?;
        self.current_period_end = Some(period_end);
        self.touch();
        Ok(ActivateOutcome::Activated)
    }

    /// Marks a failed renewal payment. Only valid from Active.
    ///
    /// Access is not revoked here; `has_access` keeps the grace window open.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` from any state other than Active.
    pub fn mark_past_due(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(SubscriptionStatus::PastDue)?;
        self.touch();
        Ok(())
    }

    /// Cancels the subscription. Valid from any non-terminal state; terminal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if already Cancelled.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(SubscriptionStatus::Cancelled)?;
        self.cancelled_at = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}
