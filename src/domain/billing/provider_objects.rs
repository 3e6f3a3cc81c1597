//! Billing-provider object models.
//!
//! Partial views of the Stripe objects the reconciler reads. Only the fields
//! the engine consumes are modeled; everything else in the payload is kept
//! verbatim in the audit snapshot's raw JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Free-form string map attached to most provider objects.
pub type Metadata = HashMap<String, String>;

/// Objects addressable by a provider id.
pub trait HasId {
    fn id(&self) -> &str;
}

/// A reference that Stripe may send either as a bare id or expanded inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl<T: HasId> Expandable<T> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(obj) => obj.id(),
        }
    }

    /// The inline object, when the reference was expanded.
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Id(_) => None,
            Expandable::Object(obj) => Some(obj),
        }
    }
}

/// Returns the id of an optional reference, treating "" as absent.
pub fn non_empty_id<T: HasId>(reference: Option<&Expandable<T>>) -> Option<String> {
    reference
        .map(|r| r.id().trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Stripe list envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringInterval {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurring {
    pub interval: RecurringInterval,
    #[serde(default = "default_interval_count")]
    pub interval_count: u32,
}

fn default_interval_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub id: String,
    pub nickname: Option<String>,
    pub unit_amount: Option<i64>,
    pub recurring: Option<Recurring>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub id: String,
    pub price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub status: String,
    /// Unix seconds.
    pub billing_cycle_anchor: Option<i64>,
    #[serde(default)]
    pub items: List<SubscriptionItem>,
    pub latest_invoice: Option<Expandable<Invoice>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Subscription {
    /// Recurring terms of the first priced item, if any.
    pub fn first_recurring(&self) -> Option<&Recurring> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.recurring.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePaymentTarget {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
}

/// One entry of an invoice's `payments` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePayment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    pub status: Option<String>,
    pub payment: Option<InvoicePaymentTarget>,
}

impl InvoicePayment {
    /// Payments with no status are treated as settled; anything else must be `paid`.
    pub fn is_successful(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "paid")
    }

    pub fn payment_intent_id(&self) -> Option<String> {
        self.payment
            .as_ref()
            .and_then(|p| non_empty_id(p.payment_intent.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// Unix seconds.
    #[serde(default)]
    pub period_start: i64,
    /// Unix seconds.
    #[serde(default)]
    pub period_end: i64,
    pub subscription: Option<Expandable<Subscription>>,
    pub payments: Option<List<InvoicePayment>>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub mode: Option<String>,
    pub subscription: Option<Expandable<Subscription>>,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    pub amount_refunded: Option<i64>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub status: Option<String>,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Checkout line item as returned by the session line-items listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: String,
    pub description: Option<String>,
    /// Minor currency units.
    #[serde(default)]
    pub amount_total: i64,
    pub price: Option<Price>,
}

macro_rules! impl_has_id {
    ($($ty:ty),*) => {
        $(impl HasId for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_has_id!(Subscription, Invoice, CheckoutSession, PaymentIntent, Charge, Refund);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expandable_accepts_bare_id() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_1",
            "subscription": "sub_1",
            "payment_intent": "pi_1"
        }))
        .unwrap();

        assert_eq!(session.subscription.as_ref().unwrap().id(), "sub_1");
        assert!(session.subscription.as_ref().unwrap().as_object().is_none());
        assert_eq!(non_empty_id(session.payment_intent.as_ref()), Some("pi_1".to_string()));
    }

    #[test]
    fn expandable_accepts_inline_object() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_1",
            "subscription": { "id": "sub_9", "status": "active" }
        }))
        .unwrap();

        let sub = session.subscription.unwrap();
        assert_eq!(sub.id(), "sub_9");
        assert_eq!(sub.as_object().unwrap().status, "active");
    }

    #[test]
    fn empty_reference_is_absent() {
        let charge: Charge = serde_json::from_value(json!({
            "id": "ch_1",
            "payment_intent": ""
        }))
        .unwrap();
        assert_eq!(non_empty_id(charge.payment_intent.as_ref()), None);
    }

    #[test]
    fn null_metadata_fields_default_to_empty() {
        let invoice: Invoice = serde_json::from_value(json!({ "id": "in_1" })).unwrap();
        assert!(invoice.metadata.is_empty());
        assert!(invoice.payments.is_none());
        assert_eq!(invoice.period_start, 0);
    }

    #[test]
    fn first_recurring_reads_first_item_price() {
        let sub: Subscription = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "items": { "data": [
                { "id": "si_1", "price": { "id": "price_1", "recurring": { "interval": "month", "interval_count": 3 } } },
                { "id": "si_2", "price": { "id": "price_2", "recurring": { "interval": "year" } } }
            ] }
        }))
        .unwrap();

        let recurring = sub.first_recurring().unwrap();
        assert_eq!(recurring.interval, RecurringInterval::Month);
        assert_eq!(recurring.interval_count, 3);
    }

    #[test]
    fn interval_count_defaults_to_one() {
        let recurring: Recurring = serde_json::from_value(json!({ "interval": "week" })).unwrap();
        assert_eq!(recurring.interval_count, 1);
    }

    #[test]
    fn invoice_payment_success_rules() {
        let paid: InvoicePayment = serde_json::from_value(json!({
            "id": "inpay_1", "created": 10, "status": "paid",
            "payment": { "type": "payment_intent", "payment_intent": "pi_1" }
        }))
        .unwrap();
        let open: InvoicePayment = serde_json::from_value(json!({
            "id": "inpay_2", "created": 11, "status": "open",
            "payment": { "type": "payment_intent", "payment_intent": "pi_2" }
        }))
        .unwrap();

        assert!(paid.is_successful());
        assert!(!open.is_successful());
        assert_eq!(paid.payment_intent_id(), Some("pi_1".to_string()));
    }
}
