//! Billing domain - canonical subscription state and its audit journal.
//!
//! Everything here is pure: status mapping, period arithmetic, correlation
//! parsing, and the value types exchanged with the state store.

mod activity;
mod correlation;
mod logical_state;
mod provider_objects;
mod save_result;
mod snapshot;
mod status;
mod status_mapper;

pub use activity::{Activity, ActivityVerb, Importance};
pub use correlation::{CorrelationContext, USER_CORRELATION_KEY};
pub use logical_state::LogicalState;
pub use provider_objects::{
    non_empty_id, Charge, CheckoutSession, Expandable, HasId, Invoice, InvoicePayment,
    InvoicePaymentTarget, LineItem, List, Metadata, PaymentIntent, Price, Recurring,
    RecurringInterval, Refund, Subscription, SubscriptionItem,
};
pub use save_result::{AtomicSaveResult, CommittedStatus};
pub use snapshot::{AuditSnapshot, JournalEntry, SnapshotKind};
pub use status::{StatusTransition, SubscriptionStatus};
pub use status_mapper::{
    compute_period, compute_period_from_invoice, map_provider_status, BillingPeriod,
    MappedStatus, FALLBACK_PERIOD_DAYS,
};
