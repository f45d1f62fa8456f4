//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `appointment` - Appointment aggregate and its booking/payment lifecycle
//! - `subscription` - Subscription aggregate and billing status lifecycle
//! - `billing` - Gateway event envelope, signature verification, checkout
//!   intents, and the idempotent event dispatcher

pub mod appointment;
pub mod billing;
pub mod foundation;
pub mod subscription;
