//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Internal user identifier carried in billing metadata as `SpredUserId`.
///
/// The nil UUID is reserved as the "unknown user" sentinel: events that
/// cannot be correlated are journaled under that partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The sentinel for events with no resolvable user.
    pub fn unknown() -> Self {
        Self(Uuid::nil())
    }

    /// Returns true for the unknown-user sentinel.
    pub fn is_unknown(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identity of one canonical status document revision.
///
/// Every write creates a fresh id; a status is superseded, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(Uuid);

impl StatusId {
    /// Creates a new random StatusId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a StatusId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The zero id, used by snapshots captured before any status exists.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StatusId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one audit snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(Uuid);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_hyphenated_uuid() {
        let id: UserId = "11111111-1111-1111-1111-111111111111".parse().unwrap();
        assert_eq!(id.to_string(), "11111111-1111-1111-1111-111111111111");
        assert!(!id.is_unknown());
    }

    #[test]
    fn user_id_rejects_garbage() {
        assert!("not-a-user".parse::<UserId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn unknown_user_is_nil() {
        let id = UserId::unknown();
        assert!(id.is_unknown());
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn status_ids_are_unique_per_revision() {
        assert_ne!(StatusId::new(), StatusId::new());
        assert!(StatusId::nil().as_uuid().is_nil());
    }

    #[test]
    fn user_id_serializes_transparently() {
        let id: UserId = "11111111-1111-1111-1111-111111111111".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"11111111-1111-1111-1111-111111111111\"");
    }
}
