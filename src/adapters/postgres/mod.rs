//! PostgreSQL adapters.
//!
//! One adapter per port, all backed by a shared `PgPool`. Idempotency and
//! at-most-one-Open-intent rely on database constraints (`payment_events`
//! unique on gateway_event_id, a partial unique index on open intents), so
//! concurrent writers resolve in the database rather than in process.

mod appointment_repository;
mod event_store;
mod intent_repository;
mod subscription_repository;

pub use appointment_repository::PostgresAppointmentRepository;
pub use event_store::PostgresEventStore;
pub use intent_repository::PostgresCheckoutIntentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
