//! Canonical subscription status: one latest-wins record per user.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StatusId, Timestamp, UserId};

use super::logical_state::LogicalState;
use super::status_mapper::BillingPeriod;

/// Entitlement-relevant facts a handler derived from one verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub subscription_id: Option<String>,
    pub payment_id: Option<String>,
    pub is_active: bool,
    pub logical_state: LogicalState,
    pub period: Option<BillingPeriod>,
}

/// One revision of a user's canonical status document.
///
/// Every write produces a new revision with a fresh `id`; revisions are
/// superseded, never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub id: StatusId,
    pub user_id: UserId,
    pub subscription_id: Option<String>,
    pub is_active: bool,
    pub payment_id: Option<String>,
    pub logical_state: LogicalState,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub recorded_at: Timestamp,
    /// Concurrency token assigned by the store.
    pub etag: Option<String>,
}

impl SubscriptionStatus {
    /// Builds a fresh revision from a transition.
    pub fn record(user_id: UserId, transition: StatusTransition, now: Timestamp) -> Self {
        Self {
            id: StatusId::new(),
            user_id,
            subscription_id: transition.subscription_id,
            is_active: transition.is_active,
            payment_id: transition.payment_id,
            logical_state: transition.logical_state,
            current_period_start: transition.period.map(|p| p.start),
            current_period_end: transition.period.map(|p| p.end),
            recorded_at: now,
            etag: None,
        }
    }

    /// Entitlement as every reader must see it.
    ///
    /// A period end in the past overrides a stored `is_active = true`.
    pub fn is_entitled_at(&self, now: Timestamp) -> bool {
        match self.current_period_end {
            Some(end) if end.is_before(&now) => false,
            _ => self.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::from_datetime(s.parse().unwrap())
    }

    fn user() -> UserId {
        "11111111-1111-1111-1111-111111111111".parse().unwrap()
    }

    fn active_until(end: Option<Timestamp>) -> SubscriptionStatus {
        let transition = StatusTransition {
            subscription_id: Some("sub_1".to_string()),
            payment_id: None,
            is_active: true,
            logical_state: LogicalState::Active,
            period: end.map(|end| BillingPeriod {
                start: end.add_days(-30),
                end,
            }),
        };
        SubscriptionStatus::record(user(), transition, ts("2024-01-01T00:00:00Z"))
    }

    #[test]
    fn record_copies_transition_and_assigns_fresh_id() {
        let a = active_until(Some(ts("2024-02-01T00:00:00Z")));
        let b = active_until(Some(ts("2024-02-01T00:00:00Z")));

        assert_ne!(a.id, b.id);
        assert_eq!(a.user_id, user());
        assert_eq!(a.current_period_start, Some(ts("2024-01-02T00:00:00Z")));
        assert!(a.etag.is_none());
    }

    #[test]
    fn past_period_end_reads_inactive() {
        let status = active_until(Some(ts("2024-02-01T00:00:00Z")));
        assert!(status.is_active);
        assert!(!status.is_entitled_at(ts("2024-02-02T00:00:00Z")));
        assert!(status.is_entitled_at(ts("2024-01-15T00:00:00Z")));
    }

    #[test]
    fn missing_period_trusts_stored_flag() {
        let status = active_until(None);
        assert!(status.is_entitled_at(ts("2099-01-01T00:00:00Z")));
    }

    #[test]
    fn inactive_stays_inactive_inside_period() {
        let mut status = active_until(Some(ts("2024-02-01T00:00:00Z")));
        status.is_active = false;
        assert!(!status.is_entitled_at(ts("2024-01-15T00:00:00Z")));
    }
}
