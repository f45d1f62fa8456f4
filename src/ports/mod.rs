//! Ports - interfaces between the domain and the outside world.
//!
//! Each aggregate gets an explicit repository port so the state machines are
//! storage-agnostic and testable against in-memory fakes. The payment
//! gateway is a port as well; the engine never talks to the processor's API
//! directly.

mod appointment_repository;
mod checkout_intent_repository;
mod event_store;
mod payment_gateway;
mod subscription_repository;

pub use appointment_repository::AppointmentRepository;
pub use checkout_intent_repository::{CheckoutIntentRepository, CreateIntentOutcome};
pub use event_store::{EventStore, InsertOutcome, PaymentEventRecord};
pub use payment_gateway::{
    CheckoutSessionRequest, GatewayError, HostedCheckoutSession, PaymentGateway,
};
pub use subscription_repository::SubscriptionRepository;
