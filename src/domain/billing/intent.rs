//! Checkout intent - local record of an in-progress payment attempt.
//!
//! An intent mediates between a local subject (appointment or subscription)
//! and a gateway-hosted checkout session. It is never exposed as a primary
//! user-facing entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{
    AppointmentId, Currency, DomainError, IntentId, Money, StateMachine, SubscriptionId,
    Timestamp,
};

/// Hosted sessions are handed out for this long before a fresh intent is
/// minted for the same subject.
const INTENT_TTL_HOURS: i64 = 24;

/// Kind of subject an intent collects money for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Appointment,
    Subscription,
}

/// Reference to the appointment or subscription being paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
}

impl SubjectRef {
    pub fn appointment(id: AppointmentId) -> Self {
        Self {
            subject_type: SubjectType::Appointment,
            subject_id: *id.as_uuid(),
        }
    }

    pub fn subscription(id: SubscriptionId) -> Self {
        Self {
            subject_type: SubjectType::Subscription,
            subject_id: *id.as_uuid(),
        }
    }
}

/// Lifecycle status of a checkout intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Awaiting the gateway's completion webhook.
    Open,

    /// A matching webhook confirmed the payment. Terminal.
    Completed,

    /// Superseded by a newer intent or aged out. Terminal.
    Expired,
}

impl StateMachine for IntentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use IntentStatus::*;
        matches!((self, target), (Open, Completed) | (Open, Expired))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use IntentStatus::*;
        match self {
            Open => vec![Completed, Expired],
            Completed | Expired => vec![],
        }
    }
}

/// Checkout intent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutIntent {
    pub id: IntentId,
    pub subject: SubjectRef,
    pub amount: Money,
    pub currency: Currency,
    pub status: IntentStatus,

    /// The gateway's session id, stored once the session is minted.
    pub gateway_session_id: Option<String>,

    /// Redirect URL of the hosted session, reused on double-clicks.
    pub redirect_url: Option<String>,

    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl CheckoutIntent {
    /// Opens a new intent for a subject.
    pub fn open(id: IntentId, subject: SubjectRef, amount: Money, currency: Currency) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            subject,
            amount,
            currency,
            status: IntentStatus::Open,
            gateway_session_id: None,
            redirect_url: None,
            created_at: now,
            expires_at: now.add_secs(INTENT_TTL_HOURS * 3600),
        }
    }

    /// Records the gateway session this intent is correlated with.
    pub fn attach_session(&mut self, session_id: impl Into<String>, redirect_url: impl Into<String>) {
        self.gateway_session_id = Some(session_id.into());
        self.redirect_url = Some(redirect_url.into());
    }

    /// Returns true if the intent is Open and has not aged out.
    pub fn is_reusable(&self) -> bool {
        self.status == IntentStatus::Open && Timestamp::now().is_before(&self.expires_at)
    }

    /// Completes the intent. Only a matching webhook event calls this.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the intent is not Open.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(IntentStatus::Completed)?;
        Ok(())
    }

    /// Expires the intent (supersession or age-out).
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the intent is not Open.
    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.status = self.status.transition_to(IntentStatus::Expired)?;
        Ok(())
    }
}
