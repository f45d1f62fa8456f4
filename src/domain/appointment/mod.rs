//! Appointment domain module.
//!
//! Owns the lifecycle of a single appointment's booking and payment status.
//! The booking side (scheduled, completed, cancelled, no-show) and the
//! payment side (not required, pending checkout, paid, failed) progress
//! independently; the aggregate enforces the reachable combinations.

mod aggregate;
mod booking_status;
mod payment_status;

pub use aggregate::{Appointment, MarkPaidOutcome};
pub use booking_status::BookingStatus;
pub use payment_status::PaymentStatus;
