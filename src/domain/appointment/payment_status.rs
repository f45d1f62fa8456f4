//! Payment status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Payment status of an appointment.
///
/// `Paid` is only reachable through the webhook dispatcher, never through a
/// client-facing write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Free appointment (price of zero). No checkout will ever happen.
    NotRequired,

    /// Awaiting a checkout confirmation from the gateway.
    PendingCheckout,

    /// Gateway confirmed the money was captured. Terminal.
    Paid,

    /// Gateway reported the checkout failed; checkout may be restarted.
    Failed,
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (PendingCheckout, Paid)
                | (PendingCheckout, Failed)
                // Restarting checkout after a failure supersedes the old intent.
                | (Failed, PendingCheckout)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            NotRequired => vec![],
            PendingCheckout => vec![Paid, Failed],
            Paid => vec![],
            Failed => vec![PendingCheckout],
        }
    }
}

impl PaymentStatus {
    /// Returns true if no further money movement is expected.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::NotRequired | PaymentStatus::Paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_become_paid_or_failed() {
        let s = PaymentStatus::PendingCheckout;
        assert!(s.can_transition_to(&PaymentStatus::Paid));
        assert!(s.can_transition_to(&PaymentStatus::Failed));
    }

    #[test]
    fn failed_can_restart_checkout() {
        assert!(PaymentStatus::Failed.can_transition_to(&PaymentStatus::PendingCheckout));
    }

    #[test]
    fn paid_is_terminal() {
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(!PaymentStatus::Paid.can_transition_to(&PaymentStatus::PendingCheckout));
    }

    #[test]
    fn not_required_is_terminal() {
        assert!(PaymentStatus::NotRequired.is_terminal());
    }

    #[test]
    fn settled_statuses() {
        assert!(PaymentStatus::NotRequired.is_settled());
        assert!(PaymentStatus::Paid.is_settled());
        assert!(!PaymentStatus::PendingCheckout.is_settled());
        assert!(!PaymentStatus::Failed.is_settled());
    }
}
