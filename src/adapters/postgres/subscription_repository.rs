//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{Plan, Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan: row
                .plan
                .parse::<Plan>()
                .map_err(|e| DomainError::database(format!("invalid plan: {}", e)))?,
            status: parse_status(&row.status)?,
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s {
        "pending" => Ok(SubscriptionStatus::Pending),
        "active" => Ok(SubscriptionStatus::Active),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        _ => Err(DomainError::database(format!(
            "invalid subscription status: {}",
            s
        ))),
    }
}

fn status_to_string(status: &SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Pending => "pending",
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::PastDue => "past_due",
        SubscriptionStatus::Cancelled => "cancelled",
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan, status, current_period_end,
                created_at, updated_at, cancelled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(subscription.plan.as_str())
        .bind(status_to_string(&subscription.status))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to save subscription: {}", e)))?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan = $2,
                status = $3,
                current_period_end = $4,
                updated_at = $5,
                cancelled_at = $6
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.plan.as_str())
        .bind(status_to_string(&subscription.status))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.updated_at.as_datetime())
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to update subscription: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "subscription not found",
            ));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan, status, current_period_end,
                   created_at, updated_at, cancelled_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to find subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan, status, current_period_end,
                   created_at, updated_at, cancelled_at
            FROM subscriptions
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("failed to find active subscription: {}", e))
        })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_pending_by_user_and_plan(
        &self,
        user_id: &UserId,
        plan: Plan,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan, status, current_period_end,
                   created_at, updated_at, cancelled_at
            FROM subscriptions
            WHERE user_id = $1 AND plan = $2 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(plan.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("failed to find pending subscription: {}", e))
        })?;

        row.map(Subscription::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Cancelled,
        ] {
            let s = status_to_string(&status);
            assert_eq!(parse_status(s).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(parse_status("paused").is_err());
    }
}
