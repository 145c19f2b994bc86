//! Archived session snapshots and their identifiers

use serde::{Deserialize, Serialize};

use super::config::RaceConfig;
use super::split::SplitRecord;
use crate::clock::RaceClock;

/// Opaque archive key for one finished race session.
///
/// Minted when a race starts and stable for the life of the session. The
/// string form is an implementation detail; consumers must never parse it to
/// recover the race date — that lives in [`RaceMetadata::race_date_ms`]
/// inside the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint an id from the session's start instant (wall-clock ms)
    pub fn mint(start_ms: u64) -> Self {
        Self(format!("race-{start_ms:013}"))
    }

    /// Borrow the key's string form, e.g. for use as a file stem
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Descriptive metadata carried with every session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceMetadata {
    /// Operator-supplied race name
    pub race_name: String,

    /// Wall-clock start date of the race, in epoch milliseconds.
    /// Zero until the race has started.
    pub race_date_ms: u64,
}

impl RaceMetadata {
    /// Metadata for a race that has not started yet
    pub fn named(race_name: impl Into<String>) -> Self {
        Self { race_name: race_name.into(), race_date_ms: 0 }
    }
}

/// Full serialized state of one session, as written to the archive at the
/// moment the race finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    /// Archive key of this session
    pub id: SessionId,

    /// Race name and start date
    pub metadata: RaceMetadata,

    /// Runner and stage counts the race ran with
    pub config: RaceConfig,

    /// Clock state at finish
    pub clock: RaceClock,

    /// One record per runner, ascending runner order
    pub records: Vec<SplitRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_stable_for_a_start_instant() {
        let id = SessionId::mint(1_700_000_000_000);
        assert_eq!(id, SessionId::mint(1_700_000_000_000));
        assert_ne!(id, SessionId::mint(1_700_000_000_001));
    }

    #[test]
    fn session_id_serializes_as_a_bare_string() {
        let id = SessionId::mint(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
