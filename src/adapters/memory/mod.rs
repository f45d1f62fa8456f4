//! In-memory adapters.
//!
//! Back the full port surface with `RwLock`-guarded maps. Used by the test
//! suite and for running the service without a database. The write-lock
//! critical sections give the same atomicity the Postgres adapters get from
//! unique constraints.

mod appointment_repository;
mod event_store;
mod intent_repository;
mod subscription_repository;

pub use appointment_repository::InMemoryAppointmentRepository;
pub use event_store::InMemoryEventStore;
pub use intent_repository::InMemoryCheckoutIntentRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
