//! Billing command handlers.

mod handle_gateway_webhook;
mod reconcile_events;
mod start_appointment_checkout;
mod start_subscription_checkout;
mod update_booking_status;

pub use handle_gateway_webhook::{HandleGatewayWebhookCommand, HandleGatewayWebhookHandler};
pub use reconcile_events::{
    ReconcileEventsCommand, ReconcileEventsHandler, ReconcileReport,
};
pub use start_appointment_checkout::{
    CheckoutRedirect, StartAppointmentCheckoutCommand, StartAppointmentCheckoutHandler,
};
pub use start_subscription_checkout::{
    StartSubscriptionCheckoutCommand, StartSubscriptionCheckoutHandler,
    SubscriptionCheckoutRedirect,
};
pub use update_booking_status::{
    BookingAction, UpdateBookingStatusCommand, UpdateBookingStatusHandler,
};
