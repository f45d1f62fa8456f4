//! EventStore port - durable record of every inbound gateway event.
//!
//! This is the idempotency backbone. The gateway delivers events at least
//! once and possibly out of order; the store's atomic insert-if-absent on
//! the gateway event id guarantees that two concurrent deliveries of the
//! same event race safely: exactly one wins the insert and applies, the
//! other observes the existing record.
//!
//! Lifecycle of a record: received (applied_at is None) → applied. A record
//! left in received is the retry contract: the gateway's redelivery, or the
//! reconciliation sweep, will reattempt it. Flagged records mark
//! consistency violations held for manual follow-up.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Record of an inbound gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEventRecord {
    /// The gateway's unique event identifier.
    pub gateway_event_id: String,

    /// Raw event type string as delivered.
    pub event_type: String,

    /// When this delivery was first recorded.
    pub received_at: Timestamp,

    /// When the associated domain mutation was applied, if it has been.
    pub applied_at: Option<Timestamp>,

    /// SHA-256 hex digest of the raw payload, for auditing.
    pub payload_hash: String,

    /// Set when the event hit the consistency-violation path and needs
    /// manual reconciliation.
    pub flagged: bool,

    /// Reason attached when the record was flagged.
    pub flag_reason: Option<String>,
}

impl PaymentEventRecord {
    /// Creates a record in the received, not-yet-applied state.
    pub fn received(
        gateway_event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload_hash: impl Into<String>,
    ) -> Self {
        Self {
            gateway_event_id: gateway_event_id.into(),
            event_type: event_type.into(),
            received_at: Timestamp::now(),
            applied_at: None,
            payload_hash: payload_hash.into(),
            flagged: false,
            flag_reason: None,
        }
    }

    /// Returns true once the domain mutation for this event has run.
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Result of attempting to insert a received event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First time this gateway event id was seen.
    Inserted,
    /// A record for this id already exists (duplicate delivery).
    AlreadyExists,
}

/// Port for the append-only gateway event store.
///
/// Implementations must back `insert_received` with a unique constraint on
/// the gateway event id so concurrent inserts are safe.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically record an event as received if no record exists yet.
    async fn insert_received(
        &self,
        record: PaymentEventRecord,
    ) -> Result<InsertOutcome, DomainError>;

    /// Look up an event by its gateway id.
    async fn find(&self, gateway_event_id: &str)
        -> Result<Option<PaymentEventRecord>, DomainError>;

    /// Mark an event as applied. Called in the same logical transaction as
    /// the domain-state write.
    async fn mark_applied(&self, gateway_event_id: &str) -> Result<(), DomainError>;

    /// Mark an event applied *and* flagged for manual reconciliation.
    ///
    /// Used for consistency violations: marking applied stops gateway
    /// retries, the flag keeps the event visible to operators.
    async fn flag(&self, gateway_event_id: &str, reason: &str) -> Result<(), DomainError>;

    /// List events still in the received state older than the cutoff.
    ///
    /// Feeds the reconciliation sweep.
    async fn list_unapplied_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<PaymentEventRecord>, DomainError>;

    /// Delete applied records older than the timestamp (retention policy).
    ///
    /// Returns the number of records deleted.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
