//! PostgreSQL implementation of AppointmentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::appointment::{Appointment, BookingStatus, PaymentStatus};
use crate::domain::foundation::{
    AppointmentId, Currency, DomainError, ErrorCode, IntentId, Money, Timestamp, TrainerId,
    UserId,
};
use crate::ports::AppointmentRepository;

pub struct PostgresAppointmentRepository {
    pool: PgPool,
}

impl PostgresAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: Uuid,
    client_id: Uuid,
    trainer_id: Uuid,
    scheduled_at: DateTime<Utc>,
    price: i64,
    currency: String,
    booking_status: String,
    payment_status: String,
    checkout_intent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DomainError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: AppointmentId::from_uuid(row.id),
            client_id: UserId::from_uuid(row.client_id),
            trainer_id: TrainerId::from_uuid(row.trainer_id),
            scheduled_at: Timestamp::from_datetime(row.scheduled_at),
            price: Money::from_minor_units(row.price)
                .map_err(|e| DomainError::database(format!("invalid price: {}", e)))?,
            currency: Currency::new(row.currency)
                .map_err(|e| DomainError::database(format!("invalid currency: {}", e)))?,
            booking_status: parse_booking_status(&row.booking_status)?,
            payment_status: parse_payment_status(&row.payment_status)?,
            checkout_intent_id: row.checkout_intent_id.map(IntentId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_booking_status(s: &str) -> Result<BookingStatus, DomainError> {
    match s {
        "scheduled" => Ok(BookingStatus::Scheduled),
        "completed" => Ok(BookingStatus::Completed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        "no_show" => Ok(BookingStatus::NoShow),
        _ => Err(DomainError::database(format!(
            "invalid booking status: {}",
            s
        ))),
    }
}

fn booking_status_to_string(status: &BookingStatus) -> &'static str {
    match status {
        BookingStatus::Scheduled => "scheduled",
        BookingStatus::Completed => "completed",
        BookingStatus::Cancelled => "cancelled",
        BookingStatus::NoShow => "no_show",
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "not_required" => Ok(PaymentStatus::NotRequired),
        "pending_checkout" => Ok(PaymentStatus::PendingCheckout),
        "paid" => Ok(PaymentStatus::Paid),
        "failed" => Ok(PaymentStatus::Failed),
        _ => Err(DomainError::database(format!(
            "invalid payment status: {}",
            s
        ))),
    }
}

fn payment_status_to_string(status: &PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::NotRequired => "not_required",
        PaymentStatus::PendingCheckout => "pending_checkout",
        PaymentStatus::Paid => "paid",
        PaymentStatus::Failed => "failed",
    }
}

#[async_trait]
impl AppointmentRepository for PostgresAppointmentRepository {
    async fn save(&self, appointment: &Appointment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, client_id, trainer_id, scheduled_at, price, currency,
                booking_status, payment_status, checkout_intent_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.client_id.as_uuid())
        .bind(appointment.trainer_id.as_uuid())
        .bind(appointment.scheduled_at.as_datetime())
        .bind(appointment.price.minor_units())
        .bind(appointment.currency.as_str())
        .bind(booking_status_to_string(&appointment.booking_status))
        .bind(payment_status_to_string(&appointment.payment_status))
        .bind(appointment.checkout_intent_id.map(|id| *id.as_uuid()))
        .bind(appointment.created_at.as_datetime())
        .bind(appointment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to save appointment: {}", e)))?;

        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments SET
                scheduled_at = $2,
                booking_status = $3,
                payment_status = $4,
                checkout_intent_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.scheduled_at.as_datetime())
        .bind(booking_status_to_string(&appointment.booking_status))
        .bind(payment_status_to_string(&appointment.payment_status))
        .bind(appointment.checkout_intent_id.map(|id| *id.as_uuid()))
        .bind(appointment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to update appointment: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::AppointmentNotFound,
                "appointment not found",
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &AppointmentId) -> Result<Option<Appointment>, DomainError> {
        let row: Option<AppointmentRow> = sqlx::query_as(
            r#"
            SELECT id, client_id, trainer_id, scheduled_at, price, currency,
                   booking_status, payment_status, checkout_intent_id,
                   created_at, updated_at
            FROM appointments
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to find appointment: {}", e)))?;

        row.map(Appointment::try_from).transpose()
    }
}
