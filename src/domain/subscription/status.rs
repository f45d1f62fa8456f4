//! Subscription status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Billing status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Awaiting the first payment confirmation. No access yet.
    Pending,

    /// Paid and current.
    Active,

    /// A renewal payment failed. Access continues as a grace window
    /// until the gateway cancels the subscription upstream.
    PastDue,

    /// Subscription ended. Terminal.
    Cancelled,
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Pending, Cancelled)
                | (Active, PastDue)
                | (Active, Cancelled)
                | (Active, Active) // renewal
                | (PastDue, Active) // recovered payment
                | (PastDue, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Cancelled],
            Active => vec![PastDue, Cancelled, Active],
            PastDue => vec![Active, Cancelled],
            Cancelled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_activates() {
        assert!(SubscriptionStatus::Pending.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn pending_cannot_go_past_due() {
        assert!(!SubscriptionStatus::Pending.can_transition_to(&SubscriptionStatus::PastDue));
    }

    #[test]
    fn active_can_renew() {
        assert!(SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn past_due_recovers_or_cancels() {
        assert!(SubscriptionStatus::PastDue.can_transition_to(&SubscriptionStatus::Active));
        assert!(SubscriptionStatus::PastDue.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(SubscriptionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn cancel_valid_from_all_non_terminal_states() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
        ] {
            assert!(status.can_transition_to(&SubscriptionStatus::Cancelled));
        }
    }
}
