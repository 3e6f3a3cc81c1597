//! Billing provider port.
//!
//! The reconciler only reads from the provider, except for refund creation
//! used by compensation.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::billing::{Invoice, LineItem, Subscription};

/// Port for the external billing provider (Stripe).
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Subscription by id, with items and prices expanded.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, BillingError>;

    /// Invoice by id, with its payment list expanded.
    async fn get_invoice(&self, invoice_id: &str) -> Result<Option<Invoice>, BillingError>;

    /// Line items of a checkout session.
    async fn list_checkout_line_items(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<LineItem>, BillingError>;

    /// Issue a refund against a payment intent.
    async fn create_refund(&self, request: RefundRequest) -> Result<RefundReceipt, BillingError>;
}

/// Refund request issued by compensation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub payment_intent_id: String,
    /// Provider-side reason, `requested_by_customer` for compensation.
    pub reason: String,
    pub metadata: HashMap<String, String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub status: Option<String>,
}

/// Billing provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingError {
    /// Error code for categorization.
    pub code: BillingErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl BillingError {
    pub fn new(code: BillingErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::NetworkError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(BillingErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::ProviderError, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::ParseError, message)
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for BillingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingErrorCode {
    NetworkError,
    AuthenticationError,
    RateLimited,
    NotFound,
    ProviderError,
    ParseError,
}

impl BillingErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingErrorCode::NetworkError | BillingErrorCode::RateLimited
        )
    }
}

impl std::fmt::Display for BillingErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BillingErrorCode::NetworkError => "network_error",
            BillingErrorCode::AuthenticationError => "authentication_error",
            BillingErrorCode::RateLimited => "rate_limited",
            BillingErrorCode::NotFound => "not_found",
            BillingErrorCode::ProviderError => "provider_error",
            BillingErrorCode::ParseError => "parse_error",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_provider_is_object_safe() {
        fn _accepts_dyn(_: &dyn BillingProvider) {}
    }

    #[test]
    fn retryability_follows_code() {
        assert!(BillingError::network("timeout").retryable);
        assert!(!BillingError::not_found("Invoice").retryable);
        assert!(!BillingError::provider("500").retryable);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = BillingError::not_found("Subscription").with_provider_code("resource_missing");
        assert_eq!(err.to_string(), "not_found: Subscription not found");
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
    }
}
