//! UpdateBookingStatusHandler - client and trainer booking transitions.
//!
//! The booking side of the appointment lifecycle: cancel, complete, no-show.
//! Payment-side transitions never go through here; those belong to the
//! webhook dispatcher alone.

use std::sync::Arc;

use crate::domain::appointment::Appointment;
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, UserId};
use crate::ports::AppointmentRepository;

/// Booking transition being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingAction {
    /// Client or trainer calls off the session.
    Cancel,
    /// Trainer marks the session as delivered.
    Complete,
    /// Trainer records that the client did not attend.
    NoShow,
}

/// Command to apply a booking transition.
#[derive(Debug, Clone)]
pub struct UpdateBookingStatusCommand {
    pub appointment_id: AppointmentId,
    pub requested_by: UserId,
    pub action: BookingAction,
}

pub struct UpdateBookingStatusHandler {
    appointments: Arc<dyn AppointmentRepository>,
}

impl UpdateBookingStatusHandler {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    pub async fn handle(
        &self,
        cmd: UpdateBookingStatusCommand,
    ) -> Result<Appointment, DomainError> {
        let mut appointment = self
            .appointments
            .find_by_id(&cmd.appointment_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::AppointmentNotFound, "appointment not found")
            })?;

        self.authorize(&appointment, &cmd)?;

        match cmd.action {
            BookingAction::Cancel => appointment.cancel()?,
            BookingAction::Complete => appointment.complete()?,
            BookingAction::NoShow => appointment.mark_no_show()?,
        }

        self.appointments.update(&appointment).await?;

        tracing::info!(
            appointment_id = %appointment.id,
            action = ?cmd.action,
            booking_status = ?appointment.booking_status,
            "booking status updated"
        );

        Ok(appointment)
    }

    fn authorize(
        &self,
        appointment: &Appointment,
        cmd: &UpdateBookingStatusCommand,
    ) -> Result<(), DomainError> {
        let is_client = appointment.client_id == cmd.requested_by;
        let is_trainer = *appointment.trainer_id.as_uuid() == *cmd.requested_by.as_uuid();

        let allowed = match cmd.action {
            BookingAction::Cancel => is_client || is_trainer,
            // Only the trainer attests to session outcomes.
            BookingAction::Complete | BookingAction::NoShow => is_trainer,
        };
        if !allowed {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "not permitted to change this appointment",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryAppointmentRepository;
    use crate::domain::appointment::BookingStatus;
    use crate::domain::foundation::{Currency, Money, Timestamp, TrainerId};

    async fn seeded(
        repo: &InMemoryAppointmentRepository,
        price: i64,
    ) -> Appointment {
        let appointment = Appointment::schedule(
            AppointmentId::new(),
            UserId::new(),
            TrainerId::new(),
            Timestamp::now().add_days(1),
            Money::from_minor_units(price).unwrap(),
            Currency::usd(),
        );
        repo.save(&appointment).await.unwrap();
        appointment
    }

    fn trainer_as_user(appointment: &Appointment) -> UserId {
        UserId::from_uuid(*appointment.trainer_id.as_uuid())
    }

    #[tokio::test]
    async fn client_can_cancel() {
        let repo = Arc::new(InMemoryAppointmentRepository::new());
        let handler = UpdateBookingStatusHandler::new(repo.clone());
        let appointment = seeded(&repo, 5000).await;

        let updated = handler
            .handle(UpdateBookingStatusCommand {
                appointment_id: appointment.id,
                requested_by: appointment.client_id,
                action: BookingAction::Cancel,
            })
            .await
            .unwrap();
        assert_eq!(updated.booking_status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn client_cannot_complete() {
        let repo = Arc::new(InMemoryAppointmentRepository::new());
        let handler = UpdateBookingStatusHandler::new(repo.clone());
        let appointment = seeded(&repo, 0).await;

        let err = handler
            .handle(UpdateBookingStatusCommand {
                appointment_id: appointment.id,
                requested_by: appointment.client_id,
                action: BookingAction::Complete,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn trainer_completes_settled_appointment() {
        let repo = Arc::new(InMemoryAppointmentRepository::new());
        let handler = UpdateBookingStatusHandler::new(repo.clone());
        let appointment = seeded(&repo, 0).await;

        let updated = handler
            .handle(UpdateBookingStatusCommand {
                appointment_id: appointment.id,
                requested_by: trainer_as_user(&appointment),
                action: BookingAction::Complete,
            })
            .await
            .unwrap();
        assert_eq!(updated.booking_status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn completing_unpaid_appointment_fails() {
        let repo = Arc::new(InMemoryAppointmentRepository::new());
        let handler = UpdateBookingStatusHandler::new(repo.clone());
        let appointment = seeded(&repo, 5000).await;

        let err = handler
            .handle(UpdateBookingStatusCommand {
                appointment_id: appointment.id,
                requested_by: trainer_as_user(&appointment),
                action: BookingAction::Complete,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[tokio::test]
    async fn stranger_is_forbidden() {
        let repo = Arc::new(InMemoryAppointmentRepository::new());
        let handler = UpdateBookingStatusHandler::new(repo.clone());
        let appointment = seeded(&repo, 0).await;

        let err = handler
            .handle(UpdateBookingStatusCommand {
                appointment_id: appointment.id,
                requested_by: UserId::new(),
                action: BookingAction::Cancel,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn trainer_records_no_show() {
        let repo = Arc::new(InMemoryAppointmentRepository::new());
        let handler = UpdateBookingStatusHandler::new(repo.clone());
        let appointment = seeded(&repo, 5000).await;

        let updated = handler
            .handle(UpdateBookingStatusCommand {
                appointment_id: appointment.id,
                requested_by: trainer_as_user(&appointment),
                action: BookingAction::NoShow,
            })
            .await
            .unwrap();
        assert_eq!(updated.booking_status, BookingStatus::NoShow);
    }
}
