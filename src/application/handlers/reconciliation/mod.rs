//! Webhook reconciliation: verified provider events to canonical state.

mod compensation;
mod handle_stripe_webhook;
mod payment_reference;
mod post_commit;

pub use compensation::{CompensationOutcome, CompensationTrigger, RefundReason};
pub use handle_stripe_webhook::{
    HandleStripeWebhookCommand, HandleStripeWebhookHandler, ReconciliationOutcome,
};
pub use payment_reference::PaymentReferenceResolver;
pub use post_commit::{
    cache_directive, ActivityIntent, PostCommitHooks, PostCommitReport, DEFAULT_SERVICE_NAME,
};
