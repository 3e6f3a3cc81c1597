//! Closed set of provider event types the reconciler understands.

use serde_json::Value;

use crate::domain::billing::{Charge, CheckoutSession, Invoice, PaymentIntent, Refund, Subscription};

/// Every Stripe event type with a handler. Anything else is unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillingEventKind {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    CheckoutSessionAsyncPaymentFailed,
    CheckoutSessionExpired,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    SubscriptionTrialWillEnd,
    SubscriptionPendingUpdateApplied,
    SubscriptionPendingUpdateExpired,
    InvoiceFinalized,
    InvoiceFinalizationFailed,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    PaymentIntentSucceeded,
    PaymentIntentPaymentFailed,
    PaymentIntentCanceled,
    ChargeRefunded,
    RefundCreated,
    RefundUpdated,
}

impl BillingEventKind {
    pub const ALL: [BillingEventKind; 20] = [
        Self::CheckoutSessionCompleted,
        Self::CheckoutSessionAsyncPaymentSucceeded,
        Self::CheckoutSessionAsyncPaymentFailed,
        Self::CheckoutSessionExpired,
        Self::SubscriptionCreated,
        Self::SubscriptionUpdated,
        Self::SubscriptionDeleted,
        Self::SubscriptionTrialWillEnd,
        Self::SubscriptionPendingUpdateApplied,
        Self::SubscriptionPendingUpdateExpired,
        Self::InvoiceFinalized,
        Self::InvoiceFinalizationFailed,
        Self::InvoicePaymentSucceeded,
        Self::InvoicePaymentFailed,
        Self::PaymentIntentSucceeded,
        Self::PaymentIntentPaymentFailed,
        Self::PaymentIntentCanceled,
        Self::ChargeRefunded,
        Self::RefundCreated,
        Self::RefundUpdated,
    ];

    /// Exact, case-sensitive match on the wire type string.
    pub fn parse(event_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == event_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionAsyncPaymentSucceeded => "checkout.session.async_payment_succeeded",
            Self::CheckoutSessionAsyncPaymentFailed => "checkout.session.async_payment_failed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::SubscriptionTrialWillEnd => "customer.subscription.trial_will_end",
            Self::SubscriptionPendingUpdateApplied => "customer.subscription.pending_update_applied",
            Self::SubscriptionPendingUpdateExpired => "customer.subscription.pending_update_expired",
            Self::InvoiceFinalized => "invoice.finalized",
            Self::InvoiceFinalizationFailed => "invoice.finalization_failed",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentPaymentFailed => "payment_intent.payment_failed",
            Self::PaymentIntentCanceled => "payment_intent.canceled",
            Self::ChargeRefunded => "charge.refunded",
            Self::RefundCreated => "refund.created",
            Self::RefundUpdated => "refund.updated",
        }
    }

    /// Handler group for this kind.
    pub fn route(&self) -> EventRoute {
        match self {
            Self::CheckoutSessionCompleted | Self::CheckoutSessionAsyncPaymentSucceeded => {
                EventRoute::CompletedCheckout
            }
            Self::CheckoutSessionAsyncPaymentFailed | Self::CheckoutSessionExpired => {
                EventRoute::NonCompletedCheckout
            }
            Self::SubscriptionCreated => EventRoute::SubscriptionChanged(SubscriptionChange::Created),
            Self::SubscriptionUpdated => EventRoute::SubscriptionChanged(SubscriptionChange::Updated),
            Self::SubscriptionDeleted => EventRoute::SubscriptionDeleted,
            Self::SubscriptionTrialWillEnd
            | Self::SubscriptionPendingUpdateApplied
            | Self::SubscriptionPendingUpdateExpired => EventRoute::SubscriptionMeta,
            Self::InvoiceFinalized
            | Self::InvoiceFinalizationFailed
            | Self::InvoicePaymentSucceeded
            | Self::InvoicePaymentFailed => EventRoute::Invoice,
            Self::PaymentIntentSucceeded
            | Self::PaymentIntentPaymentFailed
            | Self::PaymentIntentCanceled => EventRoute::PaymentIntent,
            Self::ChargeRefunded => EventRoute::ChargeRefunded,
            Self::RefundCreated => EventRoute::RefundMeta(RefundPhase::Created),
            Self::RefundUpdated => EventRoute::RefundMeta(RefundPhase::Updated),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionChange {
    Created,
    Updated,
}

impl SubscriptionChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionChange::Created => "created",
            SubscriptionChange::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefundPhase {
    Created,
    Updated,
}

impl RefundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundPhase::Created => "created",
            RefundPhase::Updated => "updated",
        }
    }
}

/// Handler groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventRoute {
    CompletedCheckout,
    NonCompletedCheckout,
    SubscriptionChanged(SubscriptionChange),
    SubscriptionDeleted,
    SubscriptionMeta,
    Invoice,
    PaymentIntent,
    ChargeRefunded,
    RefundMeta(RefundPhase),
}

/// A recognized event with its payload decoded into the object its route expects.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutedEvent {
    CompletedCheckout(CheckoutSession),
    NonCompletedCheckout(CheckoutSession),
    SubscriptionChanged {
        change: SubscriptionChange,
        subscription: Subscription,
    },
    SubscriptionDeleted(Subscription),
    SubscriptionMeta(Subscription),
    Invoice {
        payment_succeeded: bool,
        invoice: Invoice,
    },
    PaymentIntent(PaymentIntent),
    ChargeRefunded(Charge),
    RefundMeta {
        phase: RefundPhase,
        refund: Refund,
    },
}

impl RoutedEvent {
    pub fn decode(kind: BillingEventKind, object: &Value) -> Result<Self, serde_json::Error> {
        use serde::Deserialize;

        Ok(match kind.route() {
            EventRoute::CompletedCheckout => {
                RoutedEvent::CompletedCheckout(CheckoutSession::deserialize(object)?)
            }
            EventRoute::NonCompletedCheckout => {
                RoutedEvent::NonCompletedCheckout(CheckoutSession::deserialize(object)?)
            }
            EventRoute::SubscriptionChanged(change) => RoutedEvent::SubscriptionChanged {
                change,
                subscription: Subscription::deserialize(object)?,
            },
            EventRoute::SubscriptionDeleted => {
                RoutedEvent::SubscriptionDeleted(Subscription::deserialize(object)?)
            }
            EventRoute::SubscriptionMeta => {
                RoutedEvent::SubscriptionMeta(Subscription::deserialize(object)?)
            }
            EventRoute::Invoice => RoutedEvent::Invoice {
                payment_succeeded: kind == BillingEventKind::InvoicePaymentSucceeded,
                invoice: Invoice::deserialize(object)?,
            },
            EventRoute::PaymentIntent => {
                RoutedEvent::PaymentIntent(PaymentIntent::deserialize(object)?)
            }
            EventRoute::ChargeRefunded => RoutedEvent::ChargeRefunded(Charge::deserialize(object)?),
            EventRoute::RefundMeta(phase) => RoutedEvent::RefundMeta {
                phase,
                refund: Refund::deserialize(object)?,
            },
        })
    }
}
