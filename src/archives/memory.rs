//! In-memory archive backend

use std::collections::HashMap;
use std::sync::Mutex;

use crate::archive::RaceArchive;
use crate::error::{RaceError, Result};
use crate::types::{RaceSnapshot, SessionId};

/// `RaceArchive` backed by a process-local map.
///
/// The default backend for tests and for hosts that bring their own
/// persistence. Cheap to clone-share via `Arc`.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    entries: Mutex<HashMap<SessionId, RaceSnapshot>>,
}

impl MemoryArchive {
    /// An empty archive
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether the archive holds no sessions
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, RaceSnapshot>>> {
        self.entries
            .lock()
            .map_err(|_| RaceError::persistence("lock", "archive mutex poisoned"))
    }
}

#[async_trait::async_trait]
impl RaceArchive for MemoryArchive {
    async fn put(&self, snapshot: &RaceSnapshot) -> Result<()> {
        self.lock()?.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<RaceSnapshot>> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<SessionId>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.lock()?.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}
