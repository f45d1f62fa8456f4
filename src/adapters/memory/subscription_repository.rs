//! In-memory subscription repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, UserId};
use crate::domain::subscription::{Plan, Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

/// Map-backed subscription store.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self.subscriptions.write().await;
        if !subscriptions.contains_key(&subscription.id) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription {} not found", subscription.id),
            ));
        }
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.subscriptions.read().await.get(id).cloned())
    }

    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .find(|s| s.user_id == *user_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn find_pending_by_user_and_plan(
        &self,
        user_id: &UserId,
        plan: Plan,
    ) -> Result<Option<Subscription>, DomainError> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .find(|s| {
                s.user_id == *user_id
                    && s.plan == plan
                    && s.status == SubscriptionStatus::Pending
            })
            .cloned())
    }
}
