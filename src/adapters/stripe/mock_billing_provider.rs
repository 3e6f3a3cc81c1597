//! Mock billing provider for testing.
//!
//! Supports pre-configured objects, per-method error injection, and call
//! tracking for assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::{Invoice, LineItem, Subscription};
use crate::ports::{BillingError, BillingProvider, RefundReceipt, RefundRequest};

/// Mock billing provider.
///
/// ```ignore
/// let mock = MockBillingProvider::new();
/// mock.add_subscription(subscription);
/// mock.set_method_error("get_invoice", BillingError::network("timeout"));
/// ```
#[derive(Default, Clone)]
pub struct MockBillingProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<String, Subscription>,
    invoices: HashMap<String, Invoice>,
    line_items: HashMap<String, Vec<LineItem>>,

    /// Specific errors by method name.
    method_errors: HashMap<String, BillingError>,

    /// Refunds issued, in order.
    refunds: Vec<RefundRequest>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn add_subscription(&self, subscription: Subscription) {
        let id = subscription.id.clone();
        self.state().subscriptions.insert(id, subscription);
    }

    pub fn add_invoice(&self, invoice: Invoice) {
        let id = invoice.id.clone();
        self.state().invoices.insert(id, invoice);
    }

    pub fn set_line_items(&self, session_id: impl Into<String>, items: Vec<LineItem>) {
        self.state().line_items.insert(session_id.into(), items);
    }

    /// Fails every call to `method` with `error`.
    pub fn set_method_error(&self, method: &str, error: BillingError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertions
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Refund requests that reached the provider successfully.
    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.state().refunds.clone()
    }

    fn record(&self, method: &str, args: &[&str]) -> Result<(), BillingError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        match state.method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        self.record("get_subscription", &[subscription_id])?;
        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn get_invoice(&self, invoice_id: &str) -> Result<Option<Invoice>, BillingError> {
        self.record("get_invoice", &[invoice_id])?;
        Ok(self.state().invoices.get(invoice_id).cloned())
    }

    async fn list_checkout_line_items(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<LineItem>, BillingError> {
        self.record("list_checkout_line_items", &[session_id, &limit.to_string()])?;
        Ok(self
            .state()
            .line_items
            .get(session_id)
            .map(|items| items.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_refund(&self, request: RefundRequest) -> Result<RefundReceipt, BillingError> {
        self.record("create_refund", &[&request.payment_intent_id])?;
        let mut state = self.state();
        state.refunds.push(request);
        Ok(RefundReceipt {
            refund_id: format!("re_mock_{}", state.refunds.len()),
            status: Some("succeeded".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_configured_subscription_and_logs_call() {
        let mock = MockBillingProvider::new();
        mock.add_subscription(
            serde_json::from_value(json!({ "id": "sub_1", "status": "active" })).unwrap(),
        );

        let found = mock.get_subscription("sub_1").await.unwrap();
        let missing = mock.get_subscription("sub_2").await.unwrap();

        assert_eq!(found.unwrap().status, "active");
        assert!(missing.is_none());
        assert_eq!(mock.call_count("get_subscription"), 2);
    }

    #[tokio::test]
    async fn method_error_is_injected() {
        let mock = MockBillingProvider::new();
        mock.set_method_error("get_invoice", BillingError::network("timeout"));

        let result = mock.get_invoice("in_1").await;

        assert!(result.is_err());
        assert!(mock.was_called("get_invoice"));
    }

    #[tokio::test]
    async fn refunds_are_recorded_only_on_success() {
        let mock = MockBillingProvider::new();
        let request = RefundRequest {
            payment_intent_id: "pi_1".to_string(),
            reason: "requested_by_customer".to_string(),
            metadata: HashMap::new(),
            idempotency_key: None,
        };

        let receipt = mock.create_refund(request.clone()).await.unwrap();
        assert_eq!(receipt.refund_id, "re_mock_1");

        mock.set_method_error("create_refund", BillingError::provider("declined"));
        assert!(mock.create_refund(request).await.is_err());

        assert_eq!(mock.refunds().len(), 1);
        assert_eq!(mock.call_count("create_refund"), 2);
    }
}
