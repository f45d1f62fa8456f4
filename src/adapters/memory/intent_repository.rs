//! In-memory checkout intent repository.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{CheckoutIntent, SubjectRef};
use crate::domain::foundation::{DomainError, ErrorCode, IntentId};
use crate::ports::{CheckoutIntentRepository, CreateIntentOutcome};

/// Map-backed intent store.
///
/// The whole of `create_if_no_open` runs under one write lock, which is the
/// in-memory equivalent of the partial unique index the Postgres adapter
/// uses for at-most-one-Open-per-subject.
#[derive(Default)]
pub struct InMemoryCheckoutIntentRepository {
    intents: RwLock<HashMap<IntentId, CheckoutIntent>>,
}

impl InMemoryCheckoutIntentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckoutIntentRepository for InMemoryCheckoutIntentRepository {
    async fn create_if_no_open(
        &self,
        intent: CheckoutIntent,
    ) -> Result<CreateIntentOutcome, DomainError> {
        let mut intents = self.intents.write().await;
        if let Some(existing) = intents
            .values()
            .find(|i| i.subject == intent.subject && i.is_reusable())
        {
            return Ok(CreateIntentOutcome::OpenExists(existing.clone()));
        }
        intents.insert(intent.id, intent);
        Ok(CreateIntentOutcome::Created)
    }

    async fn update(&self, intent: &CheckoutIntent) -> Result<(), DomainError> {
        let mut intents = self.intents.write().await;
        if !intents.contains_key(&intent.id) {
            return Err(DomainError::new(
                ErrorCode::IntentNotFound,
                format!("intent {} not found", intent.id),
            ));
        }
        intents.insert(intent.id, intent.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &IntentId) -> Result<Option<CheckoutIntent>, DomainError> {
        Ok(self.intents.read().await.get(id).cloned())
    }

    async fn find_open_for_subject(
        &self,
        subject: &SubjectRef,
    ) -> Result<Option<CheckoutIntent>, DomainError> {
        let intents = self.intents.read().await;
        Ok(intents
            .values()
            .find(|i| i.subject == *subject && i.is_reusable())
            .cloned())
    }
}
