//! Authentication failures raised while verifying an inbound webhook.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that reject a webhook before any state is touched.
///
/// Every variant is an authentication failure: the caller answers 401 and
/// writes nothing. Redelivery is the provider's responsibility.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No `Stripe-Signature` header on the request.
    #[error("Missing signature header")]
    MissingSignature,

    /// Signature header present but malformed.
    #[error("Invalid signature header: {0}")]
    InvalidSignatureHeader(String),

    /// No `v1` signature matched the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Payload authenticated but could not be parsed into a typed event.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Test-mode event delivered to a live-only endpoint.
    #[error("Livemode mismatch")]
    LivemodeMismatch,
}

impl WebhookError {
    /// Verification failures are never retried by this service.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}
