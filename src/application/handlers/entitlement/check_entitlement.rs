//! CheckEntitlementHandler - Query handler answering "may this user use paid features?"
//!
//! The cache is a hint. On a miss or cache error the latest stored
//! revision is read with the period-end override applied.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::LogicalState;
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{EntitlementCache, SubscriptionStateStore};

#[derive(Debug, Clone, Copy)]
pub struct CheckEntitlementQuery {
    pub user_id: UserId,
}

/// Where the answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementSource {
    Cache,
    Store,
    /// No status has ever been recorded.
    NoRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementView {
    pub user_id: UserId,
    pub entitled: bool,
    pub source: EntitlementSource,
    /// Present only when read from the store.
    pub logical_state: Option<LogicalState>,
    pub current_period_end: Option<Timestamp>,
}

pub struct CheckEntitlementHandler {
    cache: Arc<dyn EntitlementCache>,
    store: Arc<dyn SubscriptionStateStore>,
}

impl CheckEntitlementHandler {
    pub fn new(cache: Arc<dyn EntitlementCache>, store: Arc<dyn SubscriptionStateStore>) -> Self {
        Self { cache, store }
    }

    pub async fn handle(&self, query: CheckEntitlementQuery) -> Result<EntitlementView, DomainError> {
        let user_id = query.user_id;

        match self.cache.get_entitlement(user_id).await {
            Ok(Some(entitled)) => {
                return Ok(EntitlementView {
                    user_id,
                    entitled,
                    source: EntitlementSource::Cache,
                    logical_state: None,
                    current_period_end: None,
                })
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Entitlement cache read failed; using store");
            }
        }

        let view = match self.store.get_latest_details(user_id).await? {
            Some(status) => EntitlementView {
                user_id,
                entitled: status.is_entitled_at(Timestamp::now()),
                source: EntitlementSource::Store,
                logical_state: Some(status.logical_state),
                current_period_end: status.current_period_end,
            },
            None => EntitlementView {
                user_id,
                entitled: false,
                source: EntitlementSource::NoRecord,
                logical_state: None,
                current_period_end: None,
            },
        };

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryEntitlementCache, InMemorySubscriptionStateStore};
    use crate::domain::billing::{BillingPeriod, JournalEntry, SnapshotKind, StatusTransition, SubscriptionStatus};
    use std::time::Duration;

    fn user() -> UserId {
        "44444444-4444-4444-4444-444444444444".parse().unwrap()
    }

    fn handler(
        cache: &InMemoryEntitlementCache,
        store: &InMemorySubscriptionStateStore,
    ) -> CheckEntitlementHandler {
        CheckEntitlementHandler::new(Arc::new(cache.clone()), Arc::new(store.clone()))
    }

    async fn store_active_until(store: &InMemorySubscriptionStateStore, end: Timestamp) {
        let now = Timestamp::now();
        let status = SubscriptionStatus::record(
            user(),
            StatusTransition {
                subscription_id: Some("sub_1".to_string()),
                payment_id: None,
                is_active: true,
                logical_state: LogicalState::Active,
                period: Some(BillingPeriod {
                    start: now.add_days(-40),
                    end,
                }),
            },
            now,
        );
        let entry = JournalEntry {
            kind: SnapshotKind::checkout_completed(),
            external_id: "cs_1".to_string(),
            event_id: "evt_1".to_string(),
            raw_json: "{}".to_string(),
        };
        assert!(store.save_atomic(&status, entry).await.is_committed());
    }

    #[tokio::test]
    async fn cache_hit_short_circuits() {
        let cache = InMemoryEntitlementCache::new();
        let store = InMemorySubscriptionStateStore::new();
        cache
            .set_entitlement(user(), true, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        store.fail_reads().await;

        let view = handler(&cache, &store)
            .handle(CheckEntitlementQuery { user_id: user() })
            .await
            .unwrap();

        assert!(view.entitled);
        assert_eq!(view.source, EntitlementSource::Cache);
    }

    #[tokio::test]
    async fn cache_miss_reads_store_with_period_override() {
        let cache = InMemoryEntitlementCache::new();
        let store = InMemorySubscriptionStateStore::new();
        store_active_until(&store, Timestamp::now().add_days(-1)).await;

        let view = handler(&cache, &store)
            .handle(CheckEntitlementQuery { user_id: user() })
            .await
            .unwrap();

        assert!(!view.entitled);
        assert_eq!(view.source, EntitlementSource::Store);
        assert_eq!(view.logical_state, Some(LogicalState::Active));
    }

    #[tokio::test]
    async fn cache_error_falls_back_to_store() {
        let cache = InMemoryEntitlementCache::new();
        let store = InMemorySubscriptionStateStore::new();
        cache.fail_reads().await;
        store_active_until(&store, Timestamp::now().add_days(10)).await;

        let view = handler(&cache, &store)
            .handle(CheckEntitlementQuery { user_id: user() })
            .await
            .unwrap();

        assert!(view.entitled);
        assert_eq!(view.source, EntitlementSource::Store);
    }

    #[tokio::test]
    async fn unknown_user_is_not_entitled() {
        let view = handler(&InMemoryEntitlementCache::new(), &InMemorySubscriptionStateStore::new())
            .handle(CheckEntitlementQuery { user_id: user() })
            .await
            .unwrap();

        assert!(!view.entitled);
        assert_eq!(view.source, EntitlementSource::NoRecord);
    }

    #[tokio::test]
    async fn store_error_propagates() {
        let store = InMemorySubscriptionStateStore::new();
        store.fail_reads().await;

        let result = handler(&InMemoryEntitlementCache::new(), &store)
            .handle(CheckEntitlementQuery { user_id: user() })
            .await;

        assert!(result.is_err());
    }
}
