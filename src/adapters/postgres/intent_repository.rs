//! PostgreSQL implementation of CheckoutIntentRepository.
//!
//! The at-most-one-Open-intent-per-subject invariant is backed by a partial
//! unique index:
//!
//! ```sql
//! CREATE UNIQUE INDEX checkout_intents_open_subject_idx
//!     ON checkout_intents (subject_type, subject_id)
//!     WHERE status = 'open';
//! ```
//!
//! Two concurrent `create_if_no_open` calls race on that index; the loser
//! reads the winner's row and hands it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{CheckoutIntent, IntentStatus, SubjectRef, SubjectType};
use crate::domain::foundation::{Currency, DomainError, ErrorCode, IntentId, Money, Timestamp};
use crate::ports::{CheckoutIntentRepository, CreateIntentOutcome};

const OPEN_SUBJECT_INDEX: &str = "checkout_intents_open_subject_idx";

pub struct PostgresCheckoutIntentRepository {
    pool: PgPool,
}

impl PostgresCheckoutIntentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, intent: &CheckoutIntent) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO checkout_intents (
                id, subject_type, subject_id, amount, currency, status,
                gateway_session_id, redirect_url, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(intent.id.as_uuid())
        .bind(subject_type_to_string(&intent.subject.subject_type))
        .bind(intent.subject.subject_id)
        .bind(intent.amount.minor_units())
        .bind(intent.currency.as_str())
        .bind(status_to_string(&intent.status))
        .bind(&intent.gateway_session_id)
        .bind(&intent.redirect_url)
        .bind(intent.created_at.as_datetime())
        .bind(intent.expires_at.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_open(
        &self,
        subject: &SubjectRef,
    ) -> Result<Option<CheckoutIntent>, DomainError> {
        let row: Option<IntentRow> = sqlx::query_as(
            r#"
            SELECT id, subject_type, subject_id, amount, currency, status,
                   gateway_session_id, redirect_url, created_at, expires_at
            FROM checkout_intents
            WHERE subject_type = $1 AND subject_id = $2 AND status = 'open'
            "#,
        )
        .bind(subject_type_to_string(&subject.subject_type))
        .bind(subject.subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to find open intent: {}", e)))?;

        row.map(CheckoutIntent::try_from).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IntentRow {
    id: Uuid,
    subject_type: String,
    subject_id: Uuid,
    amount: i64,
    currency: String,
    status: String,
    gateway_session_id: Option<String>,
    redirect_url: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<IntentRow> for CheckoutIntent {
    type Error = DomainError;

    fn try_from(row: IntentRow) -> Result<Self, Self::Error> {
        Ok(CheckoutIntent {
            id: IntentId::from_uuid(row.id),
            subject: SubjectRef {
                subject_type: parse_subject_type(&row.subject_type)?,
                subject_id: row.subject_id,
            },
            amount: Money::from_minor_units(row.amount)
                .map_err(|e| DomainError::database(format!("invalid amount: {}", e)))?,
            currency: Currency::new(row.currency)
                .map_err(|e| DomainError::database(format!("invalid currency: {}", e)))?,
            status: parse_status(&row.status)?,
            gateway_session_id: row.gateway_session_id,
            redirect_url: row.redirect_url,
            created_at: Timestamp::from_datetime(row.created_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
        })
    }
}

fn parse_subject_type(s: &str) -> Result<SubjectType, DomainError> {
    match s {
        "appointment" => Ok(SubjectType::Appointment),
        "subscription" => Ok(SubjectType::Subscription),
        _ => Err(DomainError::database(format!("invalid subject type: {}", s))),
    }
}

fn subject_type_to_string(subject_type: &SubjectType) -> &'static str {
    match subject_type {
        SubjectType::Appointment => "appointment",
        SubjectType::Subscription => "subscription",
    }
}

fn parse_status(s: &str) -> Result<IntentStatus, DomainError> {
    match s {
        "open" => Ok(IntentStatus::Open),
        "completed" => Ok(IntentStatus::Completed),
        "expired" => Ok(IntentStatus::Expired),
        _ => Err(DomainError::database(format!("invalid intent status: {}", s))),
    }
}

fn status_to_string(status: &IntentStatus) -> &'static str {
    match status {
        IntentStatus::Open => "open",
        IntentStatus::Completed => "completed",
        IntentStatus::Expired => "expired",
    }
}

#[async_trait]
impl CheckoutIntentRepository for PostgresCheckoutIntentRepository {
    async fn create_if_no_open(
        &self,
        intent: CheckoutIntent,
    ) -> Result<CreateIntentOutcome, DomainError> {
        match self.insert(&intent).await {
            Ok(()) => Ok(CreateIntentOutcome::Created),
            Err(e) => {
                let is_open_conflict = matches!(
                    &e,
                    sqlx::Error::Database(db_err)
                        if db_err.constraint() == Some(OPEN_SUBJECT_INDEX)
                );
                if !is_open_conflict {
                    return Err(DomainError::database(format!(
                        "failed to create intent: {}",
                        e
                    )));
                }

                let existing = self.fetch_open(&intent.subject).await?.ok_or_else(|| {
                    DomainError::database("open intent vanished after conflict")
                })?;
                if existing.is_reusable() {
                    return Ok(CreateIntentOutcome::OpenExists(existing));
                }

                // Aged-out Open intent blocks the index. Expire it and
                // insert the fresh one.
                let mut stale = existing;
                stale.expire()?;
                self.update(&stale).await?;
                self.insert(&intent).await.map_err(|e| {
                    DomainError::database(format!("failed to create intent: {}", e))
                })?;
                Ok(CreateIntentOutcome::Created)
            }
        }
    }

    async fn update(&self, intent: &CheckoutIntent) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE checkout_intents SET
                status = $2,
                gateway_session_id = $3,
                redirect_url = $4,
                expires_at = $5
            WHERE id = $1
            "#,
        )
        .bind(intent.id.as_uuid())
        .bind(status_to_string(&intent.status))
        .bind(&intent.gateway_session_id)
        .bind(&intent.redirect_url)
        .bind(intent.expires_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to update intent: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::IntentNotFound,
                "intent not found",
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &IntentId) -> Result<Option<CheckoutIntent>, DomainError> {
        let row: Option<IntentRow> = sqlx::query_as(
            r#"
            SELECT id, subject_type, subject_id, amount, currency, status,
                   gateway_session_id, redirect_url, created_at, expires_at
            FROM checkout_intents
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to find intent: {}", e)))?;

        row.map(CheckoutIntent::try_from).transpose()
    }

    async fn find_open_for_subject(
        &self,
        subject: &SubjectRef,
    ) -> Result<Option<CheckoutIntent>, DomainError> {
        self.fetch_open(subject).await
    }
}
