//! StartSubscriptionCheckoutHandler - creates a pending subscription and
//! mints the hosted checkout session for its first payment.
//!
//! The subscription stays Pending (no access) until the gateway's
//! completion webhook activates it, and is only persisted once the gateway
//! call succeeds. A second start for the same plan reuses the Pending
//! record and its open intent instead of minting a second session. Plan
//! changes go through the same path; the dispatcher retires the old Active
//! record when the new one activates.

use std::sync::Arc;

use crate::domain::billing::{CheckoutIntent, SubjectRef};
use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, IntentId, Money, SubscriptionId, UserId,
};
use crate::domain::subscription::{Plan, Subscription};
use crate::ports::{
    CheckoutIntentRepository, CheckoutSessionRequest, CreateIntentOutcome, PaymentGateway,
    SubscriptionRepository,
};

/// Command to start subscription checkout for a plan.
#[derive(Debug, Clone)]
pub struct StartSubscriptionCheckoutCommand {
    pub user_id: UserId,
    pub plan: Plan,
}

/// Result of starting subscription checkout.
#[derive(Debug, Clone)]
pub struct SubscriptionCheckoutRedirect {
    pub subscription_id: SubscriptionId,
    pub intent_id: IntentId,
    pub redirect_url: String,
}

pub struct StartSubscriptionCheckoutHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    intents: Arc<dyn CheckoutIntentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    success_url: String,
    cancel_url: String,
}

/// Monthly price for each plan, in minor units.
fn plan_amount(plan: Plan) -> Money {
    let minor_units = match plan {
        Plan::Basic => 1_999,
        Plan::Premium => 4_999,
        Plan::Elite => 9_999,
    };
    Money::from_minor_units(minor_units).expect("plan prices are positive")
}

impl StartSubscriptionCheckoutHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        intents: Arc<dyn CheckoutIntentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            subscriptions,
            intents,
            gateway,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: StartSubscriptionCheckoutCommand,
    ) -> Result<SubscriptionCheckoutRedirect, DomainError> {
        if let Some(active) = self.subscriptions.find_active_by_user_id(&cmd.user_id).await? {
            if active.plan == cmd.plan {
                return Err(DomainError::new(
                    ErrorCode::CheckoutConflict,
                    format!("user already has an active {} subscription", cmd.plan),
                ));
            }
            // Different plan: allowed. The old record is cancelled when the
            // new one activates, not here.
        }

        // A prior start for the same plan left a Pending record behind;
        // reuse it so double-clicks converge on one subscription.
        let (subscription, subscription_is_new) = match self
            .subscriptions
            .find_pending_by_user_and_plan(&cmd.user_id, cmd.plan)
            .await?
        {
            Some(pending) => (pending, false),
            None => (
                Subscription::create_pending(SubscriptionId::new(), cmd.user_id, cmd.plan),
                true,
            ),
        };

        let subject = SubjectRef::subscription(subscription.id);
        let fresh = CheckoutIntent::open(
            IntentId::new(),
            subject,
            plan_amount(cmd.plan),
            Currency::usd(),
        );
        let mut intent = match self.intents.create_if_no_open(fresh.clone()).await? {
            CreateIntentOutcome::Created => fresh,
            CreateIntentOutcome::OpenExists(existing) => {
                if let Some(url) = &existing.redirect_url {
                    tracing::debug!(
                        intent_id = %existing.id,
                        subscription_id = %subscription.id,
                        "reusing open subscription checkout intent"
                    );
                    return Ok(SubscriptionCheckoutRedirect {
                        subscription_id: subscription.id,
                        intent_id: existing.id,
                        redirect_url: url.clone(),
                    });
                }
                // Intent claimed but no session minted yet (a prior gateway
                // call never finished). Mint one for it now.
                existing
            }
        };

        let session = match self
            .gateway
            .create_checkout_session(CheckoutSessionRequest {
                intent_id: intent.id,
                subject,
                amount: intent.amount,
                currency: intent.currency.clone(),
                success_url: self.success_url.clone(),
                cancel_url: self.cancel_url.clone(),
            })
            .await
        {
            Ok(session) => session,
            Err(err) => {
                // The Pending record was never saved; expiring the claimed
                // intent leaves nothing behind for the retry to trip on.
                intent.expire()?;
                self.intents.update(&intent).await?;
                return Err(err.into());
            }
        };

        intent.attach_session(&session.session_id, &session.redirect_url);
        self.intents.update(&intent).await?;

        if subscription_is_new {
            self.subscriptions.save(&subscription).await?;
        }

        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %cmd.user_id,
            plan = %cmd.plan,
            intent_id = %intent.id,
            "subscription checkout session minted"
        );

        Ok(SubscriptionCheckoutRedirect {
            subscription_id: subscription.id,
            intent_id: intent.id,
            redirect_url: session.redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryCheckoutIntentRepository, InMemorySubscriptionRepository,
    };
    use crate::domain::foundation::Timestamp;
    use crate::domain::subscription::SubscriptionStatus;

    fn handler(
        subscriptions: Arc<InMemorySubscriptionRepository>,
        intents: Arc<InMemoryCheckoutIntentRepository>,
        gateway: Arc<MockPaymentGateway>,
    ) -> StartSubscriptionCheckoutHandler {
        StartSubscriptionCheckoutHandler::new(
            subscriptions,
            intents,
            gateway,
            "https://app.test/billing/success",
            "https://app.test/billing/cancel",
        )
    }

    #[tokio::test]
    async fn creates_pending_subscription_and_session() {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let handler = handler(subscriptions.clone(), intents.clone(), gateway.clone());

        let redirect = handler
            .handle(StartSubscriptionCheckoutCommand {
                user_id: UserId::new(),
                plan: Plan::Premium,
            })
            .await
            .unwrap();

        let stored = subscriptions
            .find_by_id(&redirect.subscription_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Pending);
        assert!(!stored.has_access());

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, plan_amount(Plan::Premium));
    }

    #[tokio::test]
    async fn same_plan_while_active_conflicts() {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let handler = handler(subscriptions.clone(), intents, gateway.clone());

        let user = UserId::new();
        let mut active = Subscription::create_pending(SubscriptionId::new(), user, Plan::Premium);
        active.activate(Timestamp::now().add_days(30)).unwrap();
        subscriptions.save(&active).await.unwrap();

        let err = handler
            .handle(StartSubscriptionCheckoutCommand {
                user_id: user,
                plan: Plan::Premium,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CheckoutConflict);
        assert_eq!(gateway.session_count(), 0);
    }

    #[tokio::test]
    async fn plan_change_while_active_is_allowed() {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let handler = handler(subscriptions.clone(), intents, gateway);

        let user = UserId::new();
        let mut active = Subscription::create_pending(SubscriptionId::new(), user, Plan::Basic);
        active.activate(Timestamp::now().add_days(30)).unwrap();
        subscriptions.save(&active).await.unwrap();

        let redirect = handler
            .handle(StartSubscriptionCheckoutCommand {
                user_id: user,
                plan: Plan::Elite,
            })
            .await
            .unwrap();

        // Old subscription remains active until the webhook confirms.
        let old = subscriptions.find_by_id(&active.id).await.unwrap().unwrap();
        assert_eq!(old.status, SubscriptionStatus::Active);
        let new = subscriptions
            .find_by_id(&redirect.subscription_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(new.status, SubscriptionStatus::Pending);
    }

    #[tokio::test]
    async fn double_click_reuses_subscription_and_session() {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let handler = handler(subscriptions.clone(), intents, gateway.clone());
        let cmd = StartSubscriptionCheckoutCommand {
            user_id: UserId::new(),
            plan: Plan::Premium,
        };

        let first = handler.handle(cmd.clone()).await.unwrap();
        let second = handler.handle(cmd).await.unwrap();

        assert_eq!(first.subscription_id, second.subscription_id);
        assert_eq!(first.intent_id, second.intent_id);
        assert_eq!(first.redirect_url, second.redirect_url);
        // One Pending record, one gateway session.
        assert_eq!(gateway.session_count(), 1);
    }

    #[tokio::test]
    async fn gateway_failure_leaves_no_local_state() {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let gateway = Arc::new(MockPaymentGateway::unavailable());
        let handler = handler(subscriptions.clone(), intents.clone(), gateway.clone());
        let user = UserId::new();
        let cmd = StartSubscriptionCheckoutCommand {
            user_id: user,
            plan: Plan::Basic,
        };

        let err = handler.handle(cmd.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::GatewayUnavailable);

        // No Pending subscription was persisted and no Open intent remains.
        assert!(subscriptions
            .find_pending_by_user_and_plan(&user, Plan::Basic)
            .await
            .unwrap()
            .is_none());

        // Retrying after the gateway recovers starts clean.
        gateway.clear_error();
        let redirect = handler.handle(cmd).await.unwrap();
        let stored = subscriptions
            .find_by_id(&redirect.subscription_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Pending);
    }

    #[test]
    fn plan_amounts_are_ordered() {
        assert!(plan_amount(Plan::Basic) < plan_amount(Plan::Premium));
        assert!(plan_amount(Plan::Premium) < plan_amount(Plan::Elite));
    }
}
