//! Strongly-typed user correlation extracted from provider metadata.

use crate::domain::foundation::UserId;

use super::provider_objects::Metadata;

/// Metadata key linking a billing object to an internal user.
pub const USER_CORRELATION_KEY: &str = "SpredUserId";

/// Result of parsing the correlation key out of a metadata map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationContext {
    Resolved(UserId),
    /// Key absent or blank.
    Missing,
    /// Key present but not a usable user id (including the nil UUID).
    Invalid { raw: String },
}

impl CorrelationContext {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let raw = match metadata.get(USER_CORRELATION_KEY) {
            Some(raw) if !raw.trim().is_empty() => raw.trim(),
            _ => return CorrelationContext::Missing,
        };

        match raw.parse::<UserId>() {
            Ok(user_id) if !user_id.is_unknown() => CorrelationContext::Resolved(user_id),
            _ => CorrelationContext::Invalid {
                raw: raw.to_string(),
            },
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            CorrelationContext::Resolved(user_id) => Some(*user_id),
            _ => None,
        }
    }

    /// Resolved user, or the unknown-user sentinel.
    pub fn user_or_unknown(&self) -> UserId {
        self.user_id().unwrap_or_else(UserId::unknown)
    }
}
