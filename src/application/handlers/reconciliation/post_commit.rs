//! Side effects that may only run after a committed status write.
//!
//! Both hooks take a [`CommittedStatus`], which only a fully committed
//! `AtomicSaveResult` can produce. Failures are logged and swallowed: the
//! store is already authoritative.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{Activity, CommittedStatus, SubscriptionStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::{ActivityWriter, EntitlementCache};

/// Default `service` field on emitted activities.
pub const DEFAULT_SERVICE_NAME: &str = "SubscriptionService";

/// Which audit activity a committed transition warrants.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityIntent {
    None,
    Subscribed { plan: String, amount: f64 },
    Canceled,
}

/// What the hooks actually managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostCommitReport {
    pub cache_synced: bool,
    pub activity_emitted: bool,
}

/// Cache value and expiry for a committed status.
///
/// Any time left in the period caches `is_active` for exactly that long.
/// A period that has ended, ends now, or is unknown yields a sticky `false`.
pub fn cache_directive(status: &SubscriptionStatus, now: Timestamp) -> (bool, Option<Duration>) {
    let remaining = status
        .current_period_end
        .and_then(|end| end.duration_since(&now).to_std().ok())
        .filter(|ttl| !ttl.is_zero());

    match remaining {
        Some(ttl) => (status.is_active, Some(ttl)),
        None => (false, None),
    }
}

pub struct PostCommitHooks {
    cache: Arc<dyn EntitlementCache>,
    activities: Arc<dyn ActivityWriter>,
    service_name: String,
}

impl PostCommitHooks {
    pub fn new(cache: Arc<dyn EntitlementCache>, activities: Arc<dyn ActivityWriter>) -> Self {
        Self {
            cache,
            activities,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Cache sync first, then the activity.
    pub async fn after_commit(
        &self,
        committed: &CommittedStatus,
        intent: ActivityIntent,
    ) -> PostCommitReport {
        PostCommitReport {
            cache_synced: self.sync_cache(committed).await,
            activity_emitted: self.emit_activity(committed, intent).await,
        }
    }

    pub async fn sync_cache(&self, committed: &CommittedStatus) -> bool {
        let status = committed.status();
        let (entitled, ttl) = cache_directive(status, Timestamp::now());

        match self.cache.set_entitlement(status.user_id, entitled, ttl).await {
            Ok(()) => {
                tracing::debug!(
                    user_id = %status.user_id,
                    entitled,
                    ttl_secs = ttl.map(|t| t.as_secs()),
                    "Entitlement cache synced"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %status.user_id,
                    error = %e,
                    "Entitlement cache sync failed; store remains authoritative"
                );
                false
            }
        }
    }

    pub async fn emit_activity(&self, committed: &CommittedStatus, intent: ActivityIntent) -> bool {
        let activity = match intent {
            ActivityIntent::None => return false,
            ActivityIntent::Subscribed { plan, amount } => {
                Activity::subscribed(committed, &plan, amount, &self.service_name)
            }
            ActivityIntent::Canceled => Activity::canceled(committed, &self.service_name),
        };
        let verb = activity.verb;

        match self.activities.write(activity).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    user_id = %committed.status().user_id,
                    verb = ?verb,
                    error = %e,
                    "Activity emission failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryActivityWriter, InMemoryEntitlementCache};
    use crate::domain::billing::{
        ActivityVerb, AtomicSaveResult, BillingPeriod, LogicalState, StatusTransition,
    };
    use crate::domain::foundation::UserId;

    fn user() -> UserId {
        "22222222-2222-2222-2222-222222222222".parse().unwrap()
    }

    fn status(is_active: bool, end_offset_days: Option<i64>) -> SubscriptionStatus {
        let now = Timestamp::now();
        SubscriptionStatus::record(
            user(),
            StatusTransition {
                subscription_id: Some("sub_1".to_string()),
                payment_id: Some("pi_1".to_string()),
                is_active,
                logical_state: if is_active {
                    LogicalState::Active
                } else {
                    LogicalState::Canceled
                },
                period: end_offset_days.map(|days| BillingPeriod {
                    start: now.add_days(-1),
                    end: now.add_days(days),
                }),
            },
            now,
        )
    }

    fn committed(status: SubscriptionStatus) -> CommittedStatus {
        AtomicSaveResult::committed("s", "n")
            .into_commit(status, None)
            .unwrap()
    }

    fn hooks(
        cache: &InMemoryEntitlementCache,
        activities: &InMemoryActivityWriter,
    ) -> PostCommitHooks {
        PostCommitHooks::new(Arc::new(cache.clone()), Arc::new(activities.clone()))
    }

    // ══════════════════════════════════════════════════════════════
    // Cache Directive Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn future_period_end_caches_flag_with_ttl() {
        let now = Timestamp::now();
        let (entitled, ttl) = cache_directive(&status(true, Some(30)), now);

        assert!(entitled);
        let ttl = ttl.unwrap();
        assert!(ttl > Duration::from_secs(29 * 86_400));
        assert!(ttl <= Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn inactive_status_with_future_end_caches_false_with_ttl() {
        let (entitled, ttl) = cache_directive(&status(false, Some(10)), Timestamp::now());
        assert!(!entitled);
        assert!(ttl.is_some());
    }

    #[test]
    fn past_period_end_is_sticky_false() {
        let (entitled, ttl) = cache_directive(&status(true, Some(-1)), Timestamp::now());
        assert!(!entitled);
        assert_eq!(ttl, None);
    }

    #[test]
    fn sub_second_remainder_still_caches_flag() {
        let now = Timestamp::now();
        let mut nearly_over = status(true, None);
        nearly_over.current_period_end = Some(Timestamp::from_datetime(
            *now.as_datetime() + chrono::Duration::milliseconds(400),
        ));

        let (entitled, ttl) = cache_directive(&nearly_over, now);

        assert!(entitled);
        assert_eq!(ttl, Some(Duration::from_millis(400)));
    }

    #[test]
    fn period_ending_exactly_now_is_sticky_false() {
        let now = Timestamp::now();
        let mut ending = status(true, None);
        ending.current_period_end = Some(now);

        assert_eq!(cache_directive(&ending, now), (false, None));
    }

    #[test]
    fn missing_period_is_sticky_false() {
        let (entitled, ttl) = cache_directive(&status(true, None), Timestamp::now());
        assert!(!entitled);
        assert_eq!(ttl, None);
    }

    // ══════════════════════════════════════════════════════════════
    // Hook Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscribed_intent_syncs_cache_and_emits_activity() {
        let cache = InMemoryEntitlementCache::new();
        let activities = InMemoryActivityWriter::new();

        let report = hooks(&cache, &activities)
            .with_service_name("BillingWorker")
            .after_commit(
                &committed(status(true, Some(30))),
                ActivityIntent::Subscribed {
                    plan: "Pro".to_string(),
                    amount: 9.99,
                },
            )
            .await;

        assert!(report.cache_synced);
        assert!(report.activity_emitted);
        assert_eq!(cache.get_entitlement(user()).await.unwrap(), Some(true));
        let written = activities.activities().await;
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].verb, ActivityVerb::Subscribed);
        assert_eq!(written[0].service, "BillingWorker");
    }

    #[tokio::test]
    async fn no_intent_only_syncs_cache() {
        let cache = InMemoryEntitlementCache::new();
        let activities = InMemoryActivityWriter::new();

        let report = hooks(&cache, &activities)
            .after_commit(&committed(status(true, Some(30))), ActivityIntent::None)
            .await;

        assert!(report.cache_synced);
        assert!(!report.activity_emitted);
        assert!(activities.activities().await.is_empty());
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let cache = InMemoryEntitlementCache::new();
        let activities = InMemoryActivityWriter::new();
        cache.fail_writes().await;
        activities.fail_writes().await;

        let report = hooks(&cache, &activities)
            .after_commit(&committed(status(false, None)), ActivityIntent::Canceled)
            .await;

        assert_eq!(report, PostCommitReport::default());
    }
}
