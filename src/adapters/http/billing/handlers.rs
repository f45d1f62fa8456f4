//! HTTP handlers for booking and billing endpoints.
//!
//! These handlers connect Axum routes to application layer command handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::handlers::billing::{
    HandleGatewayWebhookCommand, HandleGatewayWebhookHandler, StartAppointmentCheckoutCommand,
    StartAppointmentCheckoutHandler, StartSubscriptionCheckoutCommand,
    StartSubscriptionCheckoutHandler, UpdateBookingStatusCommand, UpdateBookingStatusHandler,
};
use crate::domain::billing::WebhookError;
use crate::domain::foundation::{AppointmentId, DomainError, ErrorCode, UserId};
use crate::ports::{
    AppointmentRepository, CheckoutIntentRepository, PaymentGateway, SubscriptionRepository,
};

use super::dto::{
    AppointmentResponse, CheckoutResponse, ErrorResponse, SubscriptionAccessResponse,
    SubscriptionCheckoutRequest, UpdateBookingStatusRequest, WebhookAckResponse,
};

/// Header carrying the gateway's webhook signature.
pub const GATEWAY_SIGNATURE_HEADER: &str = "Gateway-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; dependencies are Arc-wrapped for cheap sharing
/// across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub appointments: Arc<dyn AppointmentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub intents: Arc<dyn CheckoutIntentRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    /// Built once at startup; owns the signature verifier and dispatcher.
    pub webhook: Arc<HandleGatewayWebhookHandler>,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn start_appointment_checkout_handler(&self) -> StartAppointmentCheckoutHandler {
        StartAppointmentCheckoutHandler::new(
            self.appointments.clone(),
            self.intents.clone(),
            self.gateway.clone(),
            self.checkout_success_url.clone(),
            self.checkout_cancel_url.clone(),
        )
    }

    pub fn start_subscription_checkout_handler(&self) -> StartSubscriptionCheckoutHandler {
        StartSubscriptionCheckoutHandler::new(
            self.subscriptions.clone(),
            self.intents.clone(),
            self.gateway.clone(),
            self.checkout_success_url.clone(),
            self.checkout_cancel_url.clone(),
        )
    }

    pub fn update_booking_status_handler(&self) -> UpdateBookingStatusHandler {
        UpdateBookingStatusHandler::new(self.appointments.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the request.
///
/// In production, this would be extracted from JWT/session by auth
/// middleware. For now, uses a header-based extraction for
/// development/testing.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // In production, this would validate a JWT from the
            // Authorization header. For development, we accept X-User-Id.
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<UserId>().ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/appointments/{id} - Get appointment details
pub async fn get_appointment(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, BillingApiError> {
    let appointment = state
        .appointments
        .find_by_id(&AppointmentId::from_uuid(id))
        .await?
        .ok_or_else(|| {
            DomainError::new(ErrorCode::AppointmentNotFound, "appointment not found")
        })?;

    // Only the participants may read the appointment.
    let is_participant = appointment.client_id == user.user_id
        || *appointment.trainer_id.as_uuid() == *user.user_id.as_uuid();
    if !is_participant {
        return Err(
            DomainError::new(ErrorCode::Forbidden, "not a participant in this appointment")
                .into(),
        );
    }

    Ok(Json(AppointmentResponse::from(&appointment)))
}

/// GET /api/billing/subscriptions/access - Check current user's plan access
pub async fn check_subscription_access(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let response = match state
        .subscriptions
        .find_active_by_user_id(&user.user_id)
        .await?
    {
        Some(subscription) => SubscriptionAccessResponse::from(&subscription),
        None => SubscriptionAccessResponse::none(),
    };

    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/appointments/{id}/checkout - Start appointment checkout
pub async fn start_appointment_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.start_appointment_checkout_handler();
    let cmd = StartAppointmentCheckoutCommand {
        appointment_id: AppointmentId::from_uuid(id),
        requested_by: user.user_id,
    };

    let redirect = handler.handle(cmd).await?;

    let response = CheckoutResponse {
        intent_id: redirect.intent_id.to_string(),
        checkout_url: redirect.redirect_url,
        subscription_id: None,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/billing/subscriptions/checkout - Start subscription checkout
pub async fn start_subscription_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<SubscriptionCheckoutRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.start_subscription_checkout_handler();
    let cmd = StartSubscriptionCheckoutCommand {
        user_id: user.user_id,
        plan: request.plan,
    };

    let redirect = handler.handle(cmd).await?;

    let response = CheckoutResponse {
        intent_id: redirect.intent_id.to_string(),
        checkout_url: redirect.redirect_url,
        subscription_id: Some(redirect.subscription_id.to_string()),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/billing/appointments/{id}/status - Change booking status
pub async fn update_booking_status(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.update_booking_status_handler();
    let cmd = UpdateBookingStatusCommand {
        appointment_id: AppointmentId::from_uuid(id),
        requested_by: user.user_id,
        action: request.action.into(),
    };

    let appointment = handler.handle(cmd).await?;

    Ok(Json(AppointmentResponse::from(&appointment)))
}

/// POST /api/webhooks/gateway - Handle payment gateway webhook events
///
/// Takes the raw body; the signature covers the exact bytes on the wire.
pub async fn handle_gateway_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(GATEWAY_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            WebhookApiError(WebhookError::ParseError(format!(
                "missing {} header",
                GATEWAY_SIGNATURE_HEADER
            )))
        })?;

    let cmd = HandleGatewayWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let outcome = state.webhook.handle(cmd).await?;

    Ok(Json(WebhookAckResponse::from_outcome(outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(DomainError);

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.code {
            ErrorCode::AppointmentNotFound
            | ErrorCode::SubscriptionNotFound
            | ErrorCode::IntentNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationFailed | ErrorCode::PaymentNotRequired => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::InvalidTransition
            | ErrorCode::AlreadyPaid
            | ErrorCode::SubjectCancelled
            | ErrorCode::CheckoutConflict
            | ErrorCode::ConsistencyViolation => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::GatewayUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse::new(self.0.code.to_string(), self.0.message);
        (status, Json(body)).into_response()
    }
}

/// Error wrapper for the webhook endpoint.
///
/// The status drives the gateway's retry behavior, so the mapping comes
/// straight from `WebhookError::status_code`.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "webhook processing failed, gateway will retry");
        } else {
            tracing::warn!(error = %self.0, "webhook rejected");
        }
        let body = ErrorResponse::new("WEBHOOK_REJECTED", self.0.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryAppointmentRepository, InMemoryCheckoutIntentRepository, InMemoryEventStore,
        InMemorySubscriptionRepository,
    };
    use crate::domain::appointment::Appointment;
    use crate::domain::billing::{EventDispatcher, WebhookVerifier};
    use crate::domain::foundation::{Currency, Money, SubscriptionId, Timestamp, TrainerId};
    use crate::domain::subscription::{Plan, Subscription};

    fn test_state() -> BillingAppState {
        let appointments = Arc::new(InMemoryAppointmentRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let intents = Arc::new(InMemoryCheckoutIntentRepository::new());
        let event_store = Arc::new(InMemoryEventStore::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            event_store,
            appointments.clone(),
            subscriptions.clone(),
            intents.clone(),
        ));
        BillingAppState {
            appointments,
            subscriptions,
            intents,
            gateway: Arc::new(MockPaymentGateway::new()),
            webhook: Arc::new(HandleGatewayWebhookHandler::new(
                WebhookVerifier::new("whsec_test"),
                dispatcher,
                false,
            )),
            checkout_success_url: "https://app.test/success".to_string(),
            checkout_cancel_url: "https://app.test/cancel".to_string(),
        }
    }

    async fn seed_appointment(state: &BillingAppState, price: i64) -> Appointment {
        let appointment = Appointment::schedule(
            AppointmentId::new(),
            UserId::new(),
            TrainerId::new(),
            Timestamp::now().add_days(1),
            Money::from_minor_units(price).unwrap(),
            Currency::usd(),
        );
        state.appointments.save(&appointment).await.unwrap();
        appointment
    }

    #[tokio::test]
    async fn get_appointment_allows_participant() {
        let state = test_state();
        let appointment = seed_appointment(&state, 5000).await;
        let user = AuthenticatedUser {
            user_id: appointment.client_id,
        };

        let result =
            get_appointment(State(state), user, Path(*appointment.id.as_uuid())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn get_appointment_rejects_stranger() {
        let state = test_state();
        let appointment = seed_appointment(&state, 5000).await;
        let user = AuthenticatedUser {
            user_id: UserId::new(),
        };

        let err = match get_appointment(State(state), user, Path(*appointment.id.as_uuid())).await
        {
            Ok(_) => panic!("stranger was allowed to read the appointment"),
            Err(err) => err,
        };
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn checkout_returns_created_with_redirect() {
        let state = test_state();
        let appointment = seed_appointment(&state, 5000).await;
        let user = AuthenticatedUser {
            user_id: appointment.client_id,
        };

        let response =
            start_appointment_checkout(State(state), user, Path(*appointment.id.as_uuid()))
                .await
                .unwrap()
                .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn subscription_checkout_returns_created() {
        let state = test_state();
        let user = AuthenticatedUser {
            user_id: UserId::new(),
        };

        let response = start_subscription_checkout(
            State(state),
            user,
            Json(SubscriptionCheckoutRequest { plan: Plan::Basic }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn subscription_access_reports_active_plan() {
        let state = test_state();
        let user_id = UserId::new();
        let mut subscription =
            Subscription::create_pending(SubscriptionId::new(), user_id, Plan::Premium);
        subscription
            .activate(Timestamp::now().add_days(30))
            .unwrap();
        state.subscriptions.save(&subscription).await.unwrap();

        let result =
            check_subscription_access(State(state), AuthenticatedUser { user_id }).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn webhook_without_signature_header_is_bad_request() {
        let state = test_state();

        let err = match handle_gateway_webhook(
            State(state),
            axum::http::HeaderMap::new(),
            axum::body::Bytes::from_static(b"{}"),
        )
        .await
        {
            Ok(_) => panic!("unsigned webhook was accepted"),
            Err(err) => err,
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_with_forged_signature_is_unauthorized() {
        let state = test_state();
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            GATEWAY_SIGNATURE_HEADER,
            format!("t={},v1={}", chrono::Utc::now().timestamp(), "ab".repeat(32))
                .parse()
                .unwrap(),
        );

        let err = match handle_gateway_webhook(
            State(state),
            headers,
            axum::body::Bytes::from_static(b"{}"),
        )
        .await
        {
            Ok(_) => panic!("forged signature was accepted"),
            Err(err) => err,
        };
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    // Error mapping

    #[test]
    fn api_error_maps_not_found_to_404() {
        let err =
            BillingApiError(DomainError::new(ErrorCode::AppointmentNotFound, "missing"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_maps_already_paid_to_409() {
        let err = BillingApiError(DomainError::new(ErrorCode::AlreadyPaid, "paid"));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_maps_gateway_unavailable_to_502() {
        let err = BillingApiError(DomainError::new(ErrorCode::GatewayUnavailable, "down"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn api_error_maps_forbidden_to_403() {
        let err = BillingApiError(DomainError::new(ErrorCode::Forbidden, "nope"));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn webhook_error_maps_database_to_500() {
        let err = WebhookApiError(WebhookError::Database("pool gone".into()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
