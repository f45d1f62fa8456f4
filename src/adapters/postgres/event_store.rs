//! PostgreSQL implementation of EventStore.
//!
//! Expects a `payment_events` table with a primary key (or unique
//! constraint) on `gateway_event_id`; `insert_received` leans on it via
//! `ON CONFLICT DO NOTHING` so concurrent duplicate deliveries resolve to
//! exactly one inserted row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{EventStore, InsertOutcome, PaymentEventRecord};

pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentEventRow {
    gateway_event_id: String,
    event_type: String,
    received_at: DateTime<Utc>,
    applied_at: Option<DateTime<Utc>>,
    payload_hash: String,
    flagged: bool,
    flag_reason: Option<String>,
}

impl From<PaymentEventRow> for PaymentEventRecord {
    fn from(row: PaymentEventRow) -> Self {
        PaymentEventRecord {
            gateway_event_id: row.gateway_event_id,
            event_type: row.event_type,
            received_at: Timestamp::from_datetime(row.received_at),
            applied_at: row.applied_at.map(Timestamp::from_datetime),
            payload_hash: row.payload_hash,
            flagged: row.flagged,
            flag_reason: row.flag_reason,
        }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn insert_received(
        &self,
        record: PaymentEventRecord,
    ) -> Result<InsertOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_events (
                gateway_event_id, event_type, received_at, applied_at,
                payload_hash, flagged, flag_reason
            ) VALUES ($1, $2, $3, NULL, $4, FALSE, NULL)
            ON CONFLICT (gateway_event_id) DO NOTHING
            "#,
        )
        .bind(&record.gateway_event_id)
        .bind(&record.event_type)
        .bind(record.received_at.as_datetime())
        .bind(&record.payload_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to insert event: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn find(
        &self,
        gateway_event_id: &str,
    ) -> Result<Option<PaymentEventRecord>, DomainError> {
        let row: Option<PaymentEventRow> = sqlx::query_as(
            r#"
            SELECT gateway_event_id, event_type, received_at, applied_at,
                   payload_hash, flagged, flag_reason
            FROM payment_events
            WHERE gateway_event_id = $1
            "#,
        )
        .bind(gateway_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to find event: {}", e)))?;

        Ok(row.map(PaymentEventRecord::from))
    }

    async fn mark_applied(&self, gateway_event_id: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_events
            SET applied_at = COALESCE(applied_at, $2)
            WHERE gateway_event_id = $1
            "#,
        )
        .bind(gateway_event_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to mark event applied: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::database("event record not found"));
        }
        Ok(())
    }

    async fn flag(&self, gateway_event_id: &str, reason: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_events
            SET applied_at = COALESCE(applied_at, $2),
                flagged = TRUE,
                flag_reason = $3
            WHERE gateway_event_id = $1
            "#,
        )
        .bind(gateway_event_id)
        .bind(Utc::now())
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to flag event: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::database("event record not found"));
        }
        Ok(())
    }

    async fn list_unapplied_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<PaymentEventRecord>, DomainError> {
        let rows: Vec<PaymentEventRow> = sqlx::query_as(
            r#"
            SELECT gateway_event_id, event_type, received_at, applied_at,
                   payload_hash, flagged, flag_reason
            FROM payment_events
            WHERE applied_at IS NULL AND received_at < $1
            ORDER BY received_at ASC
            "#,
        )
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to list unapplied events: {}", e)))?;

        Ok(rows.into_iter().map(PaymentEventRecord::from).collect())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM payment_events
            WHERE applied_at IS NOT NULL AND received_at < $1
            "#,
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to delete events: {}", e)))?;

        Ok(result.rows_affected())
    }
}
