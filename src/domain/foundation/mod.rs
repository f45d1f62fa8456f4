//! Shared domain primitives.
//!
//! Value objects and error types used across the appointment, subscription,
//! and billing modules.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AppointmentId, IntentId, SubscriptionId, TrainerId, UserId};
pub use money::{Currency, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
