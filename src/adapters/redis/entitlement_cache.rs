//! Redis-backed entitlement cache.
//!
//! `SET subscription:{userId} true|false [PX ttl]` on write, plain `GET` on read.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{entitlement_key, EntitlementCache};

#[derive(Clone)]
pub struct RedisEntitlementCache {
    conn: MultiplexedConnection,
}

impl RedisEntitlementCache {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisEntitlementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEntitlementCache").finish_non_exhaustive()
    }
}

/// PX takes whole milliseconds >= 1; sub-millisecond remainders round up.
fn ttl_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_millis() + u128::from(ttl.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(u64::MAX).max(1)
}

fn set_command(key: &str, value: &str, ttl: Option<Duration>) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(ttl) = ttl {
        cmd.arg("PX").arg(ttl_millis(ttl));
    }
    cmd
}

/// Parses a cached flag; anything unrecognized is a miss.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl EntitlementCache for RedisEntitlementCache {
    async fn set_entitlement(
        &self,
        user_id: UserId,
        entitled: bool,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError> {
        let key = entitlement_key(user_id);
        let value = if entitled { "true" } else { "false" };
        let mut conn = self.conn.clone();

        let cmd = set_command(&key, value, ttl);

        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e: redis::RedisError| DomainError::cache(e.to_string()).with_detail("key", key))
    }

    async fn get_entitlement(&self, user_id: UserId) -> Result<Option<bool>, DomainError> {
        let key = entitlement_key(user_id);
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e: redis::RedisError| DomainError::cache(e.to_string()).with_detail("key", key.clone()))?;

        Ok(raw.as_deref().and_then(parse_flag))
    }
}
