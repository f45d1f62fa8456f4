//! HTTP adapter for booking and billing endpoints.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingAppState};
pub use routes::{billing_router, billing_routes, webhook_routes};
