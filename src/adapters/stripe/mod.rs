//! Stripe adapters: REST client and a mock for tests.

mod mock_billing_provider;
mod stripe_client;

pub use mock_billing_provider::{MethodCall, MockBillingProvider};
pub use stripe_client::{StripeBillingClient, StripeConfig};
