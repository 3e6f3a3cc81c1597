//! Entitlement cache port: a TTL-bounded boolean per user.
//!
//! Never authoritative. Readers fall back to the state store on a miss.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, UserId};

/// Cache key for a user's entitlement flag.
pub fn entitlement_key(user_id: UserId) -> String {
    format!("subscription:{}", user_id)
}

#[async_trait]
pub trait EntitlementCache: Send + Sync {
    /// Sets the flag; `ttl = None` means no expiry.
    async fn set_entitlement(
        &self,
        user_id: UserId,
        entitled: bool,
        ttl: Option<Duration>,
    ) -> Result<(), DomainError>;

    /// `None` on a cold cache.
    async fn get_entitlement(&self, user_id: UserId) -> Result<Option<bool>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefixed_user_id() {
        let user: UserId = "11111111-1111-1111-1111-111111111111".parse().unwrap();
        assert_eq!(
            entitlement_key(user),
            "subscription:11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn entitlement_cache_is_object_safe() {
        fn _accepts_dyn(_: &dyn EntitlementCache) {}
    }
}
