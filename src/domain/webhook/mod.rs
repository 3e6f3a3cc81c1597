//! Webhook domain - authenticating and classifying provider deliveries.

mod errors;
mod event_kind;
mod stripe_event;
mod verifier;

pub use errors::WebhookError;
pub use event_kind::{BillingEventKind, EventRoute, RefundPhase, RoutedEvent, SubscriptionChange};
pub use stripe_event::{StripeEvent, StripeEventData};
pub use verifier::{SignatureHeader, StripeWebhookVerifier, VerifiedEvent, DEFAULT_TOLERANCE_SECS};

#[cfg(test)]
pub use verifier::compute_test_signature;
