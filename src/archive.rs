//! Persistence boundary for finished races.
//!
//! `RaceArchive` is a key-value store of [`RaceSnapshot`] values keyed by
//! [`SessionId`]. The session driver writes one snapshot at the
//! Running→Finished transition, fire-and-forget; a browsing surface reads
//! them back later via `list`/`get`. Implementations live in
//! [`archives`](crate::archives).

use crate::error::Result;
use crate::types::{RaceSnapshot, SessionId};

/// Key-value persistence for finished race sessions.
///
/// All methods are fallible; failures map to
/// [`RaceError::Persistence`](crate::RaceError::Persistence) and must leave
/// any previously stored snapshots intact.
#[async_trait::async_trait]
pub trait RaceArchive: Send + Sync + 'static {
    /// Store a snapshot under its session id, replacing any previous value
    async fn put(&self, snapshot: &RaceSnapshot) -> Result<()>;

    /// Fetch a snapshot by id
    ///
    /// Returns:
    /// - `Ok(Some(snapshot))` - the session is archived
    /// - `Ok(None)` - no session under this id
    /// - `Err(e)` - the backend failed
    async fn get(&self, id: &SessionId) -> Result<Option<RaceSnapshot>>;

    /// All stored session ids, in unspecified order
    async fn list(&self) -> Result<Vec<SessionId>>;

    /// Remove one session. Removing an absent id is not an error.
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Remove every stored session
    async fn clear(&self) -> Result<()>;
}
