//! JSON-directory archive backend

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::RaceArchive;
use crate::error::{RaceError, Result};
use crate::types::{RaceSnapshot, SessionId};

/// `RaceArchive` storing one pretty-printed JSON file per session.
///
/// Files are named `<session-id>.json` inside the archive directory. Ids are
/// never parsed for meaning; the file stem is only used to enumerate keys.
/// Snapshots are small (a few KB), so the blocking filesystem calls run
/// inline rather than on a blocking pool.
#[derive(Debug, Clone)]
pub struct DirArchive {
    root: PathBuf,
}

impl DirArchive {
    /// Open an archive rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|err| {
            RaceError::persistence_with_source(
                "open",
                format!("cannot create archive directory {}", root.display()),
                Box::new(err),
            )
        })?;
        Ok(Self { root })
    }

    /// The archive directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{}.json", id.as_str()))
    }
}

#[async_trait::async_trait]
impl RaceArchive for DirArchive {
    async fn put(&self, snapshot: &RaceSnapshot) -> Result<()> {
        let path = self.path_for(&snapshot.id);
        let json = serde_json::to_vec_pretty(snapshot)?;
        std::fs::write(&path, json).map_err(|err| {
            RaceError::persistence_with_source(
                "put",
                format!("cannot write {}", path.display()),
                Box::new(err),
            )
        })?;
        debug!(id = %snapshot.id, path = %path.display(), "snapshot archived");
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<RaceSnapshot>> {
        let path = self.path_for(id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(RaceError::persistence_with_source(
                    "get",
                    format!("cannot read {}", path.display()),
                    Box::new(err),
                ));
            }
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn list(&self) -> Result<Vec<SessionId>> {
        let entries = std::fs::read_dir(&self.root).map_err(|err| {
            RaceError::persistence_with_source(
                "list",
                format!("cannot read {}", self.root.display()),
                Box::new(err),
            )
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|err| {
                    RaceError::persistence_with_source("list", "directory walk failed", Box::new(err))
                })?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match path.file_stem().and_then(|stem| stem.to_str()) {
                    Some(stem) => ids.push(SessionId::from(stem.to_string())),
                    None => warn!(path = %path.display(), "skipping non-UTF-8 archive entry"),
                }
            }
        }
        Ok(ids)
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(RaceError::persistence_with_source(
                "delete",
                format!("cannot remove {}", path.display()),
                Box::new(err),
            )),
        }
    }

    async fn clear(&self) -> Result<()> {
        for id in self.list().await? {
            self.delete(&id).await?;
        }
        Ok(())
    }
}
