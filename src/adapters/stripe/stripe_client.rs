//! Stripe REST client implementing `BillingProvider`.
//!
//! Authenticates with the secret key via HTTP basic auth. Reads expand the
//! nested objects the reconciler needs so a single round trip suffices.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::billing::{Invoice, LineItem, List, Subscription};
use crate::ports::{BillingError, BillingErrorCode, BillingProvider, RefundReceipt, RefundRequest};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeRefundResponse {
    id: String,
    status: Option<String>,
}

/// Stripe billing client.
pub struct StripeBillingClient {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeBillingClient {
    pub fn new(config: StripeConfig) -> Result<Self, BillingError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BillingError::network(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// GET returning `None` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, BillingError> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| BillingError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| BillingError::parse(format!("Failed to parse Stripe response: {}", e)))
    }
}

/// Maps a non-success Stripe response to a `BillingError`.
async fn error_from_response(response: reqwest::Response) -> BillingError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<StripeErrorEnvelope>(&body).ok();

    let code = match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            BillingErrorCode::AuthenticationError
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => BillingErrorCode::RateLimited,
        s if s.is_server_error() => BillingErrorCode::NetworkError,
        _ => BillingErrorCode::ProviderError,
    };

    let message = parsed
        .as_ref()
        .and_then(|p| p.error.message.clone())
        .unwrap_or(body);
    let error = BillingError::new(code, format!("Stripe API error ({}): {}", status, message));

    match parsed.and_then(|p| p.error.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

#[async_trait]
impl BillingProvider for StripeBillingClient {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        if subscription_id.is_empty() {
            return Ok(None);
        }
        self.get_json(
            &format!("/v1/subscriptions/{}", subscription_id),
            &[("expand[]", "items.data.price")],
        )
        .await
    }

    async fn get_invoice(&self, invoice_id: &str) -> Result<Option<Invoice>, BillingError> {
        if invoice_id.is_empty() {
            return Ok(None);
        }
        self.get_json(
            &format!("/v1/invoices/{}", invoice_id),
            &[("expand[]", "payments")],
        )
        .await
    }

    async fn list_checkout_line_items(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<LineItem>, BillingError> {
        let limit = limit.to_string();
        let list: Option<List<LineItem>> = self
            .get_json(
                &format!("/v1/checkout/sessions/{}/line_items", session_id),
                &[("limit", limit.as_str())],
            )
            .await?;
        Ok(list.map(|l| l.data).unwrap_or_default())
    }

    async fn create_refund(&self, request: RefundRequest) -> Result<RefundReceipt, BillingError> {
        let mut form: Vec<(String, String)> = vec![
            ("payment_intent".to_string(), request.payment_intent_id.clone()),
            ("reason".to_string(), request.reason.clone()),
        ];
        for (key, value) in &request.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        let mut builder = self
            .http_client
            .post(self.url("/v1/refunds"))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&form);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BillingError::network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let refund: StripeRefundResponse = response
            .json()
            .await
            .map_err(|e| BillingError::parse(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(RefundReceipt {
            refund_id: refund.id,
            status: refund.status,
        })
    }
}
