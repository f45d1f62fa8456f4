//! StartAppointmentCheckoutHandler - mints a hosted checkout session for a
//! priced appointment.
//!
//! Double-click safe: a second start while an Open intent exists returns
//! the same redirect instead of minting a second session. A gateway failure
//! leaves no usable local state behind; the claimed intent is expired so a
//! retry starts clean.

use std::sync::Arc;

use crate::domain::appointment::PaymentStatus;
use crate::domain::billing::{CheckoutIntent, SubjectRef};
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, IntentId, UserId};
use crate::ports::{
    AppointmentRepository, CheckoutIntentRepository, CheckoutSessionRequest,
    CreateIntentOutcome, PaymentGateway,
};

/// Command to start checkout for an appointment.
#[derive(Debug, Clone)]
pub struct StartAppointmentCheckoutCommand {
    pub appointment_id: AppointmentId,
    /// The authenticated user making the request; must own the appointment.
    pub requested_by: UserId,
}

/// Redirect handed back to the client browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
    pub intent_id: IntentId,
    pub redirect_url: String,
}

pub struct StartAppointmentCheckoutHandler {
    appointments: Arc<dyn AppointmentRepository>,
    intents: Arc<dyn CheckoutIntentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    success_url: String,
    cancel_url: String,
}

impl StartAppointmentCheckoutHandler {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        intents: Arc<dyn CheckoutIntentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            appointments,
            intents,
            gateway,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    pub async fn handle(
        &self,
        cmd: StartAppointmentCheckoutCommand,
    ) -> Result<CheckoutRedirect, DomainError> {
        let mut appointment = self
            .appointments
            .find_by_id(&cmd.appointment_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::AppointmentNotFound, "appointment not found")
            })?;

        if appointment.client_id != cmd.requested_by {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "appointment belongs to another client",
            ));
        }
        if appointment.price.is_zero() {
            return Err(DomainError::new(
                ErrorCode::PaymentNotRequired,
                "free appointments have no checkout",
            ));
        }
        if appointment.is_closed() {
            return Err(DomainError::new(
                ErrorCode::SubjectCancelled,
                "appointment is no longer open for checkout",
            ));
        }
        if appointment.payment_status == PaymentStatus::Paid {
            return Err(DomainError::new(
                ErrorCode::AlreadyPaid,
                "appointment is already paid",
            ));
        }

        let subject = SubjectRef::appointment(appointment.id);
        let fresh = CheckoutIntent::open(
            IntentId::new(),
            subject,
            appointment.price,
            appointment.currency.clone(),
        );

        let mut intent = match self.intents.create_if_no_open(fresh.clone()).await? {
            CreateIntentOutcome::Created => fresh,
            CreateIntentOutcome::OpenExists(existing) => {
                if let Some(url) = &existing.redirect_url {
                    tracing::debug!(
                        intent_id = %existing.id,
                        appointment_id = %appointment.id,
                        "reusing open checkout intent"
                    );
                    return Ok(CheckoutRedirect {
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
                // Release the claim so the retry is not stuck behind an
                // intent with no session.
                intent.expire()?;
                self.intents.update(&intent).await?;
                return Err(err.into());
            }
        };

        intent.attach_session(&session.session_id, &session.redirect_url);
        self.intents.update(&intent).await?;

        appointment.attach_intent(intent.id)?;
        self.appointments.update(&appointment).await?;

        tracing::info!(
            appointment_id = %appointment.id,
            intent_id = %intent.id,
            session_id = %session.session_id,
            "checkout session minted"
        );

        Ok(CheckoutRedirect {
            intent_id: intent.id,
            redirect_url: session.redirect_url,
        })
    }
}
