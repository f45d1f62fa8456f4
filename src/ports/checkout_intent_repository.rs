//! Checkout intent repository port.

use async_trait::async_trait;

use crate::domain::billing::{CheckoutIntent, SubjectRef};
use crate::domain::foundation::{DomainError, IntentId};

/// Result of attempting to create an intent for a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateIntentOutcome {
    /// No Open intent existed; the new one was stored.
    Created,
    /// An Open, unexpired intent already covers this subject. The caller
    /// should hand back its redirect instead of minting a second session.
    OpenExists(CheckoutIntent),
}

/// Repository port for CheckoutIntent records.
///
/// `create_if_no_open` must be atomic per subject (unique partial index or
/// a single guarded critical section) so two concurrent checkout starts
/// for the same subject produce at most one Open intent.
#[async_trait]
pub trait CheckoutIntentRepository: Send + Sync {
    /// Store a new Open intent unless the subject already has one.
    async fn create_if_no_open(
        &self,
        intent: CheckoutIntent,
    ) -> Result<CreateIntentOutcome, DomainError>;

    /// Update an existing intent (completion, expiry, session correlation).
    ///
    /// # Errors
    ///
    /// - `IntentNotFound` if the intent does not exist
    async fn update(&self, intent: &CheckoutIntent) -> Result<(), DomainError>;

    /// Find an intent by id. Returns `None` if not found.
    async fn find_by_id(&self, id: &IntentId) -> Result<Option<CheckoutIntent>, DomainError>;

    /// Find the Open intent for a subject, if one exists.
    async fn find_open_for_subject(
        &self,
        subject: &SubjectRef,
    ) -> Result<Option<CheckoutIntent>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_intent_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn CheckoutIntentRepository) {}
    }
}
