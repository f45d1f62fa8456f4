//! Subscription repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscription::{Plan, Subscription};

/// Repository port for Subscription aggregate persistence.
///
/// The single-active-subscription-per-user invariant is enforced by the
/// activation path; `find_active_by_user_id` exists so it can locate the
/// record that has to give way.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Persist a new subscription.
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the subscription does not exist
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by id. Returns `None` if not found.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find the user's currently Active subscription, if any.
    async fn find_active_by_user_id(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find the user's Pending subscription for a plan, if any.
    ///
    /// An earlier checkout start leaves a Pending record behind; starting
    /// again reuses it instead of minting a second one.
    async fn find_pending_by_user_and_plan(
        &self,
        user_id: &UserId,
        plan: Plan,
    ) -> Result<Option<Subscription>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
