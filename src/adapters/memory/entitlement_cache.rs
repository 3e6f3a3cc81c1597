//! In-memory entitlement cache with TTL bookkeeping.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::EntitlementCache;

/// A cached flag as last written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedEntitlement {
    pub entitled: bool,
    pub ttl: Option<Duration>,
    written_at: Instant,
}

impl CachedEntitlement {
    fn is_expired(&self, now: Instant) -> bool {
        self.ttl
            .map_or(false, |ttl| now.duration_since(self.written_at) >= ttl)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<UserId, CachedEntitlement>,
    fail_writes: bool,
    fail_reads: bool,
    writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEntitlementCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryEntitlementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry regardless of expiry, for assertions.
    pub async fn entry(&self, user_id: UserId) -> Option<CachedEntitlement> {
        self.state.read().await.entries.get(&user_id).copied()
    }

    pub async fn write_count(&self) -> usize {
        self.state.read().await.writes
    }

    pub async fn fail_writes(&self) {
        self.state.write().await.fail_writes = true;
    }

    pub async fn fail_reads(&self) {
        self.state.write().await.fail_reads = true;
    }
}

#[async_trait]
impl EntitlementCache for InMemoryEntitlementCache {
    async fn set_entitlement(
        &self,
        user_id: UserId,
        entitled: bool,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.fail_writes {
            return Err(DomainError::cache("cache unavailable"));
        }
        state.writes += 1;
        state.entries.insert(
            user_id,
            CachedEntitlement {
                entitled,
                ttl,
                written_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn get_entitlement(&self, user_id: UserId) -> Result<Option<bool>, DomainError> {
        let state = self.state.read().await;
        if state.fail_reads {
            return Err(DomainError::cache("cache unavailable"));
        }
        let now = Instant::now();
        Ok(state
            .entries
            .get(&user_id)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.entitled))
    }
}
