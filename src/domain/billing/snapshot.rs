//! Append-only audit journal of processed events.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{SnapshotId, StatusId, Timestamp, UserId};

/// Journal tag combining event type and, where relevant, a sub-phase.
///
/// e.g. `subscription:updated:active`, `invoice:invoice.payment_failed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotKind(String);

impl SnapshotKind {
    pub fn checkout_completed() -> Self {
        Self("checkout_session:completed".to_string())
    }

    pub fn checkout_event(event_type: &str) -> Self {
        Self(format!("checkout_session:{}", event_type))
    }

    /// `source` is `created` or `updated`; `provider_status` is Stripe's raw status.
    pub fn subscription_change(source: &str, provider_status: &str) -> Self {
        Self(format!("subscription:{}:{}", source, provider_status))
    }

    pub fn subscription_deleted() -> Self {
        Self("subscription:deleted".to_string())
    }

    pub fn subscription_event(event_type: &str) -> Self {
        Self(format!("subscription_event:{}", event_type))
    }

    pub fn invoice(event_type: &str) -> Self {
        Self(format!("invoice:{}", event_type))
    }

    pub fn payment_intent(event_type: &str) -> Self {
        Self(format!("payment_intent:{}", event_type))
    }

    pub fn charge_refunded() -> Self {
        Self("charge:refunded".to_string())
    }

    /// `phase` is `created` or `updated`.
    pub fn refund(phase: &str) -> Self {
        Self(format!("refund:{}", phase))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a handler asks the store to journal for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub kind: SnapshotKind,
    /// Id of the provider object the event is about.
    pub external_id: String,
    /// Provider event id; unique per delivery of the same event.
    pub event_id: String,
    /// The verified request body, verbatim.
    pub raw_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSnapshot {
    pub id: SnapshotId,
    pub user_id: UserId,
    /// Canonical status current at capture time; nil when none existed.
    pub status_id: StatusId,
    pub kind: SnapshotKind,
    pub external_id: String,
    pub event_id: String,
    pub raw_json: String,
    pub recorded_at: Timestamp,
    pub etag: Option<String>,
}

impl AuditSnapshot {
    pub fn capture(user_id: UserId, status_id: StatusId, entry: JournalEntry, now: Timestamp) -> Self {
        Self {
            id: SnapshotId::new(),
            user_id,
            status_id,
            kind: entry.kind,
            external_id: entry.external_id,
            event_id: entry.event_id,
            raw_json: entry.raw_json,
            recorded_at: now,
            etag: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_render_expected_tags() {
        assert_eq!(SnapshotKind::checkout_completed().as_str(), "checkout_session:completed");
        assert_eq!(
            SnapshotKind::checkout_event("checkout.session.expired").as_str(),
            "checkout_session:checkout.session.expired"
        );
        assert_eq!(
            SnapshotKind::subscription_change("updated", "active").as_str(),
            "subscription:updated:active"
        );
        assert_eq!(SnapshotKind::subscription_deleted().as_str(), "subscription:deleted");
        assert_eq!(
            SnapshotKind::subscription_event("customer.subscription.trial_will_end").as_str(),
            "subscription_event:customer.subscription.trial_will_end"
        );
        assert_eq!(
            SnapshotKind::invoice("invoice.payment_failed").as_str(),
            "invoice:invoice.payment_failed"
        );
        assert_eq!(SnapshotKind::charge_refunded().as_str(), "charge:refunded");
        assert_eq!(SnapshotKind::refund("created").as_str(), "refund:created");
    }

    #[test]
    fn capture_links_status_and_copies_entry() {
        let user: UserId = "11111111-1111-1111-1111-111111111111".parse().unwrap();
        let status_id = StatusId::new();
        let entry = JournalEntry {
            kind: SnapshotKind::charge_refunded(),
            external_id: "ch_1".to_string(),
            event_id: "evt_1".to_string(),
            raw_json: "{}".to_string(),
        };

        let snapshot = AuditSnapshot::capture(user, status_id, entry, Timestamp::now());

        assert_eq!(snapshot.user_id, user);
        assert_eq!(snapshot.status_id, status_id);
        assert_eq!(snapshot.external_id, "ch_1");
        assert_eq!(snapshot.event_id, "evt_1");
    }
}
