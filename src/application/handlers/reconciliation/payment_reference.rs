//! Recovers a payment intent id by walking the provider's object graph.
//!
//! invoice -> payments, subscription -> latest invoice -> payments.
//! Every failure degrades to `None`; nothing escapes this boundary.

use std::sync::Arc;

use crate::domain::billing::{non_empty_id, Invoice};
use crate::ports::BillingProvider;

pub struct PaymentReferenceResolver {
    billing: Arc<dyn BillingProvider>,
}

impl PaymentReferenceResolver {
    pub fn new(billing: Arc<dyn BillingProvider>) -> Self {
        Self { billing }
    }

    /// Most recently created successful payment on the invoice.
    pub fn select_payment(invoice: &Invoice) -> Option<String> {
        let payments = invoice.payments.as_ref()?;
        let mut candidates: Vec<_> = payments
            .data
            .iter()
            .filter(|p| p.is_successful())
            .filter_map(|p| p.payment_intent_id().map(|id| (p.created, id)))
            .collect();
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.into_iter().next().map(|(_, id)| id)
    }

    pub async fn from_invoice(&self, invoice_id: &str) -> Option<String> {
        if invoice_id.trim().is_empty() {
            return None;
        }

        match self.billing.get_invoice(invoice_id).await {
            Ok(Some(invoice)) => {
                let payment = Self::select_payment(&invoice);
                if payment.is_none() {
                    tracing::debug!(invoice_id, "Invoice has no successful payment");
                }
                payment
            }
            Ok(None) => {
                tracing::warn!(invoice_id, "Invoice not found while resolving payment");
                None
            }
            Err(e) => {
                tracing::warn!(invoice_id, error = %e, "Invoice lookup failed while resolving payment");
                None
            }
        }
    }

    pub async fn from_subscription(&self, subscription_id: &str) -> Option<String> {
        if subscription_id.trim().is_empty() {
            return None;
        }

        let subscription = match self.billing.get_subscription(subscription_id).await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                tracing::warn!(subscription_id, "Subscription not found while resolving payment");
                return None;
            }
            Err(e) => {
                tracing::warn!(subscription_id, error = %e, "Subscription lookup failed while resolving payment");
                return None;
            }
        };

        let invoice_id = non_empty_id(subscription.latest_invoice.as_ref())?;
        self.from_invoice(&invoice_id).await
    }
}
