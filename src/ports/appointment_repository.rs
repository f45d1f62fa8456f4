//! Appointment repository port.

use async_trait::async_trait;

use crate::domain::appointment::Appointment;
use crate::domain::foundation::{AppointmentId, DomainError};

/// Repository port for Appointment aggregate persistence.
///
/// Implementations must support an optimistic version check (or equivalent
/// row lock) on update so concurrent writers for the same appointment
/// serialize; the dispatcher additionally holds a per-subject lock around
/// read-validate-write.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Persist a new appointment.
    async fn save(&self, appointment: &Appointment) -> Result<(), DomainError>;

    /// Update an existing appointment.
    ///
    /// # Errors
    ///
    /// - `AppointmentNotFound` if the appointment does not exist
    async fn update(&self, appointment: &Appointment) -> Result<(), DomainError>;

    /// Find an appointment by id. Returns `None` if not found.
    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, DomainError>;
}
