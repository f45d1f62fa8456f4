//! In-memory appointment repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::appointment::Appointment;
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode};
use crate::ports::AppointmentRepository;

/// Map-backed appointment store.
///
/// Counts update calls so tests can assert that an idempotent code path
/// performed no write.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
    updates: AtomicUsize,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `update` calls that reached the store.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn save(&self, appointment: &Appointment) -> Result<(), DomainError> {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), DomainError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(DomainError::new(
                ErrorCode::AppointmentNotFound,
                format!("appointment {} not found", appointment.id),
            ));
        }
        appointments.insert(appointment.id, appointment.clone());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, DomainError> {
        Ok(self.appointments.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, Money, Timestamp, TrainerId, UserId};

    fn appointment() -> Appointment {
        Appointment::schedule(
            AppointmentId::new(),
            UserId::new(),
            TrainerId::new(),
            Timestamp::now().add_days(1),
            Money::from_minor_units(5000).unwrap(),
            Currency::usd(),
        )
    }

    #[tokio::test]
    async fn save_then_find() {
        let repo = InMemoryAppointmentRepository::new();
        let appt = appointment();
        repo.save(&appt).await.unwrap();
        assert_eq!(repo.find_by_id(&appt.id).await.unwrap(), Some(appt));
    }

    #[tokio::test]
    async fn update_unknown_appointment_fails() {
        let repo = InMemoryAppointmentRepository::new();
        let err = repo.update(&appointment()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AppointmentNotFound);
        assert_eq!(repo.update_count(), 0);
    }
}
