//! Pure translation from provider status to entitlement state and periods.

use crate::domain::foundation::Timestamp;

use super::logical_state::LogicalState;
use super::provider_objects::{Invoice, RecurringInterval, Subscription};

/// Window used when no subscription object is available at all.
pub const FALLBACK_PERIOD_DAYS: i64 = 30;

/// Entitlement flag paired with the logical state that justifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedStatus {
    pub is_active: bool,
    pub logical_state: LogicalState,
}

impl MappedStatus {
    fn new(is_active: bool, logical_state: LogicalState) -> Self {
        Self {
            is_active,
            logical_state,
        }
    }
}

/// Paid entitlement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Maps a provider subscription to `(is_active, logical_state)`.
///
/// `trialing` grants access only when `allow_trial_access` is set; the
/// deleted-subscription path passes `false`.
pub fn map_provider_status(
    subscription: Option<&Subscription>,
    allow_trial_access: bool,
) -> MappedStatus {
    let Some(subscription) = subscription else {
        return MappedStatus::new(false, LogicalState::Unknown);
    };

    match subscription.status.as_str() {
        "active" => MappedStatus::new(true, LogicalState::Active),
        "trialing" if allow_trial_access => MappedStatus::new(true, LogicalState::Trialing),
        "trialing" => MappedStatus::new(false, LogicalState::TrialBlocked),
        "past_due" => MappedStatus::new(true, LogicalState::PastDue),
        "incomplete" => MappedStatus::new(false, LogicalState::Incomplete),
        "incomplete_expired" => MappedStatus::new(false, LogicalState::IncompleteExpired),
        "unpaid" => MappedStatus::new(false, LogicalState::Unpaid),
        "canceled" => MappedStatus::new(false, LogicalState::Canceled),
        "paused" => MappedStatus::new(false, LogicalState::Paused),
        other => MappedStatus::new(false, LogicalState::Provider(other.to_string())),
    }
}

/// Billing period of a subscription.
///
/// Starts at the billing-cycle anchor and advances by the first price's
/// recurring interval. Without a recurring price the window is empty
/// (end = start). Without any subscription, a 30-day window from `now`.
pub fn compute_period(subscription: Option<&Subscription>, now: Timestamp) -> BillingPeriod {
    let Some(subscription) = subscription else {
        return BillingPeriod {
            start: now,
            end: now.add_days(FALLBACK_PERIOD_DAYS),
        };
    };

    let start = subscription
        .billing_cycle_anchor
        .and_then(Timestamp::from_unix)
        .unwrap_or(now);

    let end = match subscription.first_recurring() {
        Some(recurring) => {
            let count = recurring.interval_count;
            match recurring.interval {
                RecurringInterval::Day => start.add_days(i64::from(count)),
                RecurringInterval::Week => start.add_days(7 * i64::from(count)),
                RecurringInterval::Month => start.add_months(count),
                RecurringInterval::Year => start.add_months(count.saturating_mul(12)),
            }
        }
        None => start,
    };

    BillingPeriod { start, end }
}

/// Billing period taken directly from an invoice's period fields.
pub fn compute_period_from_invoice(invoice: &Invoice) -> Option<BillingPeriod> {
    Some(BillingPeriod {
        start: Timestamp::from_unix(invoice.period_start)?,
        end: Timestamp::from_unix(invoice.period_end)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ts(s: &str) -> Timestamp {
        Timestamp::from_datetime(s.parse().unwrap())
    }

    fn subscription(status: &str) -> Subscription {
        serde_json::from_value(json!({ "id": "sub_1", "status": status })).unwrap()
    }

    fn recurring_subscription(anchor: i64, interval: &str, count: u32) -> Subscription {
        serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "billing_cycle_anchor": anchor,
            "items": { "data": [
                { "id": "si_1", "price": { "id": "price_1", "recurring": { "interval": interval, "interval_count": count } } }
            ] }
        }))
        .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Status Mapping Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn missing_subscription_is_unknown_and_inactive() {
        let mapped = map_provider_status(None, true);
        assert!(!mapped.is_active);
        assert_eq!(mapped.logical_state, LogicalState::Unknown);
    }

    #[test]
    fn lookup_table_matches_vocabulary() {
        let cases = [
            ("active", true, LogicalState::Active),
            ("past_due", true, LogicalState::PastDue),
            ("incomplete", false, LogicalState::Incomplete),
            ("incomplete_expired", false, LogicalState::IncompleteExpired),
            ("unpaid", false, LogicalState::Unpaid),
            ("canceled", false, LogicalState::Canceled),
            ("paused", false, LogicalState::Paused),
        ];

        for (status, active, state) in cases {
            let mapped = map_provider_status(Some(&subscription(status)), true);
            assert_eq!(mapped.is_active, active, "status {}", status);
            assert_eq!(mapped.logical_state, state, "status {}", status);
        }
    }

    #[test]
    fn trialing_follows_allow_flag() {
        let sub = subscription("trialing");

        let allowed = map_provider_status(Some(&sub), true);
        assert!(allowed.is_active);
        assert_eq!(allowed.logical_state, LogicalState::Trialing);

        let blocked = map_provider_status(Some(&sub), false);
        assert!(!blocked.is_active);
        assert_eq!(blocked.logical_state, LogicalState::TrialBlocked);
    }

    #[test]
    fn unrecognized_status_falls_back_to_raw_string() {
        let mapped = map_provider_status(Some(&subscription("mystery")), true);
        assert!(!mapped.is_active);
        assert_eq!(mapped.logical_state.as_str(), "mystery");
    }

    // ══════════════════════════════════════════════════════════════
    // Period Computation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn monthly_period_advances_one_calendar_month() {
        let anchor = ts("2024-01-31T12:00:00Z");
        let sub = recurring_subscription(anchor.unix_seconds(), "month", 1);

        let period = compute_period(Some(&sub), Timestamp::now());

        assert_eq!(period.start, anchor);
        assert_eq!(period.end, ts("2024-02-29T12:00:00Z"));
    }

    #[test]
    fn weekly_and_daily_periods_multiply_interval_count() {
        let anchor = ts("2024-01-01T00:00:00Z");

        let weekly = compute_period(
            Some(&recurring_subscription(anchor.unix_seconds(), "week", 2)),
            Timestamp::now(),
        );
        assert_eq!(weekly.end, ts("2024-01-15T00:00:00Z"));

        let daily = compute_period(
            Some(&recurring_subscription(anchor.unix_seconds(), "day", 10)),
            Timestamp::now(),
        );
        assert_eq!(daily.end, ts("2024-01-11T00:00:00Z"));
    }

    #[test]
    fn unrepresentable_interval_collapses_to_anchor() {
        let anchor = ts("2024-01-01T00:00:00Z");

        for interval in ["day", "week", "month", "year"] {
            let period = compute_period(
                Some(&recurring_subscription(anchor.unix_seconds(), interval, u32::MAX)),
                Timestamp::now(),
            );
            assert_eq!(period.start, anchor);
            assert_eq!(period.end, anchor, "interval {}", interval);
        }
    }

    #[test]
    fn yearly_period_advances_calendar_year() {
        let anchor = ts("2024-03-01T00:00:00Z");
        let sub = recurring_subscription(anchor.unix_seconds(), "year", 1);
        assert_eq!(
            compute_period(Some(&sub), Timestamp::now()).end,
            ts("2025-03-01T00:00:00Z")
        );
    }

    #[test]
    fn no_recurring_price_yields_empty_window() {
        let anchor = ts("2024-01-01T00:00:00Z");
        let sub: Subscription = serde_json::from_value(json!({
            "id": "sub_1",
            "status": "active",
            "billing_cycle_anchor": anchor.unix_seconds()
        }))
        .unwrap();

        let period = compute_period(Some(&sub), Timestamp::now());
        assert_eq!(period.start, anchor);
        assert_eq!(period.end, anchor);
    }

    #[test]
    fn no_subscription_defaults_to_thirty_days_from_now() {
        let now = ts("2024-05-01T00:00:00Z");
        let period = compute_period(None, now);
        assert_eq!(period.start, now);
        assert_eq!(period.end, ts("2024-05-31T00:00:00Z"));
    }

    #[test]
    fn invoice_period_is_taken_verbatim() {
        let invoice: Invoice = serde_json::from_value(json!({
            "id": "in_1",
            "period_start": ts("2024-01-01T00:00:00Z").unix_seconds(),
            "period_end": ts("2024-02-01T00:00:00Z").unix_seconds()
        }))
        .unwrap();

        let period = compute_period_from_invoice(&invoice).unwrap();
        assert_eq!(period.start, ts("2024-01-01T00:00:00Z"));
        assert_eq!(period.end, ts("2024-02-01T00:00:00Z"));
    }

    // ══════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════

    proptest! {
        #[test]
        fn trialing_activity_equals_allow_flag(allow in any::<bool>()) {
            let mapped = map_provider_status(Some(&subscription("trialing")), allow);
            prop_assert_eq!(mapped.is_active, allow);
        }

        #[test]
        fn period_end_never_precedes_start(
            anchor in 0i64..4_000_000_000,
            interval in prop_oneof![Just("day"), Just("week"), Just("month"), Just("year")],
            count in 1u32..36,
        ) {
            let sub = recurring_subscription(anchor, interval, count);
            let period = compute_period(Some(&sub), Timestamp::now());
            prop_assert!(!period.end.is_before(&period.start));
        }
    }
}
