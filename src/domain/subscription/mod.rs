//! Subscription domain module.
//!
//! Owns the billing status lifecycle of a user's plan subscription.
//! At most one subscription per user may be Active at a time.

mod aggregate;
mod plan;
mod status;

pub use aggregate::{ActivateOutcome, Subscription};
pub use plan::Plan;
pub use status::SubscriptionStatus;
