//! Compensating refunds for checkouts whose entitlement cannot be trusted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::billing::USER_CORRELATION_KEY;
use crate::ports::{BillingProvider, RefundRequest};

/// Provider-side refund reason for every compensating refund.
const PROVIDER_REFUND_REASON: &str = "requested_by_customer";

/// Machine-readable reason attached to the refund metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundReason {
    MissingUserId,
    InvalidUserId,
    SubscriptionStateError,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::MissingUserId => "missing_spred_user_id",
            RefundReason::InvalidUserId => "invalid_spred_user_id",
            RefundReason::SubscriptionStateError => "subscription_state_error",
        }
    }
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationOutcome {
    Issued { refund_id: String },
    /// No payment reference to refund against.
    Skipped,
    /// Provider rejected or was unreachable; logged, not retried here.
    Failed { message: String },
}

pub struct CompensationTrigger {
    billing: Arc<dyn BillingProvider>,
}

impl CompensationTrigger {
    pub fn new(billing: Arc<dyn BillingProvider>) -> Self {
        Self { billing }
    }

    /// Issues a refund for `payment_id`. Never errors.
    ///
    /// The idempotency key is derived from payment and reason, so a
    /// redelivered event cannot refund twice.
    pub async fn compensate(
        &self,
        payment_id: Option<&str>,
        reason: RefundReason,
        user_ref: &str,
    ) -> CompensationOutcome {
        let Some(payment_id) = payment_id.filter(|id| !id.trim().is_empty()) else {
            tracing::warn!(
                reason = %reason,
                user_ref,
                "Refund skipped: no payment reference resolved"
            );
            return CompensationOutcome::Skipped;
        };

        let mut metadata = HashMap::new();
        metadata.insert(USER_CORRELATION_KEY.to_string(), user_ref.to_string());
        metadata.insert("Reason".to_string(), reason.as_str().to_string());

        let request = RefundRequest {
            payment_intent_id: payment_id.to_string(),
            reason: PROVIDER_REFUND_REASON.to_string(),
            metadata,
            idempotency_key: Some(format!("compensation:{}:{}", payment_id, reason)),
        };

        match self.billing.create_refund(request).await {
            Ok(receipt) => {
                tracing::info!(
                    payment_intent = payment_id,
                    refund_id = %receipt.refund_id,
                    reason = %reason,
                    user_ref,
                    "Compensating refund issued"
                );
                CompensationOutcome::Issued {
                    refund_id: receipt.refund_id,
                }
            }
            Err(e) => {
                tracing::error!(
                    payment_intent = payment_id,
                    reason = %reason,
                    user_ref,
                    error = %e,
                    "Compensating refund failed"
                );
                CompensationOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}
