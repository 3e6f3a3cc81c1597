//! HTTP handlers for reconciliation endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::{
    CheckEntitlementHandler, CheckEntitlementQuery, HandleStripeWebhookCommand,
    HandleStripeWebhookHandler,
};
use crate::domain::foundation::{DomainError, UserId};
use crate::domain::webhook::WebhookError;
use crate::ports::{EntitlementCache, SubscriptionStateStore};

use super::dto::{EntitlementResponse, ErrorResponse, HealthResponse, WebhookAckResponse};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state, cloned per request.
#[derive(Clone)]
pub struct ReconcilerAppState {
    pub webhook_handler: Arc<HandleStripeWebhookHandler>,
    pub state_store: Arc<dyn SubscriptionStateStore>,
    pub entitlement_cache: Arc<dyn EntitlementCache>,
}

impl ReconcilerAppState {
    pub fn entitlement_handler(&self) -> CheckEntitlementHandler {
        CheckEntitlementHandler::new(self.entitlement_cache.clone(), self.state_store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /internal/stripe/webhook
///
/// 401 on any verification failure; 200 for everything that verified.
pub async fn handle_stripe_webhook(
    State(state): State<ReconcilerAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ReconcilerApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    let cmd = HandleStripeWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let outcome = state.webhook_handler.handle(cmd).await?;
    tracing::debug!(outcome = ?outcome, "Webhook processed");

    Ok(Json(WebhookAckResponse { received: true }))
}

/// GET /internal/subscriptions/:user_id/entitlement
pub async fn get_entitlement(
    State(state): State<ReconcilerAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ReconcilerApiError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| ReconcilerApiError::InvalidUserId(user_id.clone()))?;

    let view = state
        .entitlement_handler()
        .handle(CheckEntitlementQuery { user_id })
        .await?;

    Ok(Json(EntitlementResponse::from(view)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts handler errors to HTTP responses.
#[derive(Debug)]
pub enum ReconcilerApiError {
    Webhook(WebhookError),
    InvalidUserId(String),
    Domain(DomainError),
}

impl From<WebhookError> for ReconcilerApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl From<DomainError> for ReconcilerApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ReconcilerApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ReconcilerApiError::Webhook(err) => {
                tracing::warn!(error = %err, "Webhook rejected");
                (
                    err.status_code(),
                    ErrorResponse::new("WEBHOOK_REJECTED", err.to_string()),
                )
            }
            ReconcilerApiError::InvalidUserId(raw) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("INVALID_USER_ID", format!("Not a user id: {}", raw)),
            ),
            ReconcilerApiError::Domain(err) => {
                tracing::error!(error = %err, "Entitlement lookup failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(err.code.to_string(), "Entitlement store unavailable"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}
