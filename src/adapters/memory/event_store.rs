//! In-memory event store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{EventStore, InsertOutcome, PaymentEventRecord};

/// Map-backed event store keyed by gateway event id.
///
/// The write lock makes `insert_received` atomic, matching the unique
/// constraint the Postgres adapter relies on.
#[derive(Default)]
pub struct InMemoryEventStore {
    records: RwLock<HashMap<String, PaymentEventRecord>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_received(
        &self,
        record: PaymentEventRecord,
    ) -> Result<InsertOutcome, DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.gateway_event_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        records.insert(record.gateway_event_id.clone(), record);
        Ok(InsertOutcome::Inserted)
    }

    async fn find(
        &self,
        gateway_event_id: &str,
    ) -> Result<Option<PaymentEventRecord>, DomainError> {
        Ok(self.records.read().await.get(gateway_event_id).cloned())
    }

    async fn mark_applied(&self, gateway_event_id: &str) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(gateway_event_id)
            .ok_or_else(|| DomainError::database("event record not found"))?;
        if record.applied_at.is_none() {
            record.applied_at = Some(Timestamp::now());
        }
        Ok(())
    }

    async fn flag(&self, gateway_event_id: &str, reason: &str) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(gateway_event_id)
            .ok_or_else(|| DomainError::database("event record not found"))?;
        record.applied_at = Some(Timestamp::now());
        record.flagged = true;
        record.flag_reason = Some(reason.to_string());
        Ok(())
    }

    async fn list_unapplied_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<PaymentEventRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.applied_at.is_none() && r.received_at.is_before(&cutoff))
            .cloned()
            .collect())
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !(r.is_applied() && r.received_at.is_before(&cutoff)));
        Ok((before - records.len()) as u64)
    }
}
