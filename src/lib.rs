//! Type-safe race timing core for multi-stage races.
//!
//! Splitwall models a stopwatch-and-splits workflow for races with many
//! runners and a fixed number of stages: start a race clock, record each
//! runner's split at every stage boundary, undo mistakes, and archive
//! finished races for later browsing.
//!
//! # Architecture
//!
//! - **Session state machine**: one [`RaceSession`] moves through
//!   Configuring → Running → Finished. Splits fill each runner's stages in
//!   ascending order and store segment durations (per-stage time, not
//!   cumulative); the race auto-finishes when the last stage of the last
//!   runner is recorded.
//! - **Driver task**: [`SessionDriver::spawn`] owns the session on a single
//!   tokio task, serializing operator commands, running the one-second
//!   display tick while Running, and publishing derived [`DisplayState`]
//!   over a watch channel.
//! - **Archive**: finished races are written fire-and-forget to a
//!   [`RaceArchive`] backend ([`MemoryArchive`] in-process,
//!   [`DirArchive`] one JSON file per race).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use splitwall::{RaceConfig, Splitwall};
//!
//! #[tokio::main]
//! async fn main() -> splitwall::Result<()> {
//!     let handle = Splitwall::session(RaceConfig::new(12, 3), "club relay");
//!
//!     handle.start().await?;
//!     handle.record_split(4).await?;
//!     handle.undo_last_split(4).await?;
//!
//!     println!("{}", handle.display().elapsed);
//!     Ok(())
//! }
//! ```

// Core state machine
pub mod clock;
mod error;
pub mod ledger;
pub mod session;
pub mod types;

// Task-based session driving
pub mod driver;

// Persistence boundary
pub mod archive;
pub mod archives;

// Core exports
pub use clock::{ManualTimeSource, RaceClock, SystemTimeSource, TimeSource};
pub use error::{RaceError, Result};
pub use ledger::{SplitLedger, SplitOutcome, UndoOutcome};
pub use session::{RaceSession, SessionState};
pub use types::*;

// Driver exports
pub use driver::{DisplayState, RunnerStatus, SessionDriver, SessionHandle};

// Archive exports
pub use archive::RaceArchive;
pub use archives::{DirArchive, MemoryArchive};

use std::sync::Arc;

/// Unified entry point for spawning race sessions.
///
/// Wires a [`RaceSession`] to the system clock and an archive backend and
/// hands back the [`SessionHandle`] operators drive it through. For custom
/// time sources or archives, compose [`RaceSession`] and
/// [`SessionDriver::spawn`] directly.
pub struct Splitwall;

impl Splitwall {
    /// Spawn a session with an in-memory archive.
    ///
    /// Suitable when the host owns persistence itself or no archive is
    /// wanted; finished races stay retrievable through the handle's
    /// snapshot until the handle is dropped.
    pub fn session(config: RaceConfig, race_name: impl Into<String>) -> SessionHandle {
        Self::session_with_archive(config, race_name, Arc::new(MemoryArchive::new()))
    }

    /// Spawn a session archiving finished races as JSON files under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive directory cannot be created.
    pub fn session_in_dir(
        config: RaceConfig,
        race_name: impl Into<String>,
        dir: impl AsRef<std::path::Path>,
    ) -> Result<SessionHandle> {
        let archive = DirArchive::open(dir)?;
        Ok(Self::session_with_archive(config, race_name, Arc::new(archive)))
    }

    /// Spawn a session persisting to the given archive
    pub fn session_with_archive(
        config: RaceConfig,
        race_name: impl Into<String>,
        archive: Arc<dyn RaceArchive>,
    ) -> SessionHandle {
        let session = RaceSession::with_config(config, race_name, Arc::new(SystemTimeSource));
        SessionDriver::spawn(session, archive)
    }
}
