//! Booking status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Booking status of an appointment, independent of payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Appointment is on the calendar.
    Scheduled,

    /// Session took place.
    Completed,

    /// Appointment was called off. Terminal.
    Cancelled,

    /// Client did not attend. Terminal.
    NoShow,
}

impl StateMachine for BookingStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use BookingStatus::*;
        matches!(
            (self, target),
            (Scheduled, Completed) | (Scheduled, Cancelled) | (Scheduled, NoShow)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use BookingStatus::*;
        match self {
            Scheduled => vec![Completed, Cancelled, NoShow],
            Completed | Cancelled | NoShow => vec![],
        }
    }
}
