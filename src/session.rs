//! The race session lifecycle: Configuring → Running → Finished.
//!
//! `RaceSession` composes the config, clock and split ledger into one state
//! machine. All mutation is synchronous; the async layer in
//! [`driver`](crate::driver) serializes commands onto it and owns the
//! periodic tick. Transitions:
//!
//! - `start` — Configuring → Running; requires a valid config, zeroes the
//!   clock to now, rebuilds the ledger all-unset, mints the session id
//! - `record_split` — Running → Running, or straight to Finished when the
//!   split completes the last unset stage of the last unfinished runner
//!   (auto-finish)
//! - `finish` — Running → Finished, manually
//! - `set_runners`/`set_stages` — rejected while Running; from Configuring
//!   or Finished they return the session to Configuring, resetting clock
//!   and ledger
//!
//! Undo never leaves Finished: it is only accepted while Running.

use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{RaceClock, TimeSource};
use crate::error::{RaceError, Result};
use crate::ledger::{SplitLedger, SplitOutcome, UndoOutcome};
use crate::types::{RaceConfig, RaceMetadata, RaceSnapshot, SessionId};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Config editable, clock zeroed, no splits recordable
    Configuring,

    /// Config locked, clock ticking, splits recordable
    Running,

    /// Clock stopped, splits immutable, snapshot archived
    Finished,
}

/// One race from configuration through finish.
pub struct RaceSession {
    config: RaceConfig,
    clock: RaceClock,
    ledger: SplitLedger,
    metadata: RaceMetadata,
    state: SessionState,
    id: Option<SessionId>,
    time: Arc<dyn TimeSource>,
}

impl RaceSession {
    /// A new session in the Configuring state with an empty config
    pub fn new(race_name: impl Into<String>, time: Arc<dyn TimeSource>) -> Self {
        Self::with_config(RaceConfig::default(), race_name, time)
    }

    /// A new session starting from the given config
    pub fn with_config(
        config: RaceConfig,
        race_name: impl Into<String>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let mut ledger = SplitLedger::empty();
        ledger.initialize(&config);
        Self {
            config,
            clock: RaceClock::new(),
            ledger,
            metadata: RaceMetadata::named(race_name),
            state: SessionState::Configuring,
            id: None,
            time,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current config
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Current clock state
    pub fn clock(&self) -> &RaceClock {
        &self.clock
    }

    /// The split ledger
    pub fn ledger(&self) -> &SplitLedger {
        &self.ledger
    }

    /// Race name and date
    pub fn metadata(&self) -> &RaceMetadata {
        &self.metadata
    }

    /// Session id, minted at start
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Elapsed race time in milliseconds at the last clock read
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Replace the runner count. Rejected while Running; from Finished this
    /// returns the session to Configuring.
    pub fn set_runners(&mut self, runners: u32) -> Result<()> {
        self.edit_config("set_runners", |config| config.set_runners(runners))
    }

    /// Replace the stage count. Same lifecycle rules as [`set_runners`](Self::set_runners).
    pub fn set_stages(&mut self, stages: u32) -> Result<()> {
        self.edit_config("set_stages", |config| config.set_stages(stages))
    }

    /// Start the race: Configuring → Running.
    ///
    /// Zeroes the clock to now, rebuilds the ledger with all-unset records
    /// and mints the session id. Returns the minted id.
    pub fn start(&mut self) -> Result<SessionId> {
        if self.state != SessionState::Configuring {
            return Err(RaceError::state("start", self.state));
        }
        if !self.config.is_valid() {
            return Err(RaceError::InvalidConfig {
                runners: self.config.runners,
                stages: self.config.stages,
            });
        }

        let now = self.time.now_ms();
        self.clock.start(now);
        self.ledger.initialize(&self.config);
        self.metadata.race_date_ms = now;
        let id = SessionId::mint(now);
        self.id = Some(id.clone());
        self.state = SessionState::Running;

        info!(
            %id,
            runners = self.config.runners,
            stages = self.config.stages,
            "race started"
        );
        Ok(id)
    }

    /// Advance the clock to now. Only meaningful while Running; a call in
    /// any other state changes nothing.
    pub fn advance_clock(&mut self) {
        if self.state == SessionState::Running {
            self.clock.advance(self.time.now_ms());
        }
    }

    /// Record a split for `runner` at the current wall-clock instant.
    ///
    /// Delegates to the ledger (first-unset stage, segment arithmetic) and
    /// then runs the auto-finish check: if this split set the last unset
    /// stage of the last unfinished runner, the session transitions straight
    /// to Finished without a manual `finish` call.
    pub fn record_split(&mut self, runner: u32) -> Result<SplitOutcome> {
        if self.state != SessionState::Running {
            return Err(RaceError::state("record_split", self.state));
        }

        let now = self.time.now_ms();
        self.clock.advance(now);
        let outcome = self.ledger.record_split(runner, self.clock.elapsed_ms())?;

        match &outcome {
            SplitOutcome::Recorded(record) => {
                debug!(runner, total_ms = record.total_ms(), "split recorded");
                if self.ledger.all_finished() {
                    self.finish_at(now);
                }
            }
            SplitOutcome::AlreadyFinished => {
                debug!(runner, "split ignored, runner already finished");
            }
        }
        Ok(outcome)
    }

    /// Clear the last recorded stage for `runner`. Only accepted while
    /// Running; undo never transitions a session out of Finished.
    pub fn undo_last_split(&mut self, runner: u32) -> Result<UndoOutcome> {
        if self.state != SessionState::Running {
            return Err(RaceError::state("undo_last_split", self.state));
        }

        let outcome = self.ledger.undo_last_split(runner)?;
        match &outcome {
            UndoOutcome::Cleared(_) => debug!(runner, "last split cleared"),
            UndoOutcome::NothingToUndo => debug!(runner, "undo ignored, nothing recorded"),
        }
        Ok(outcome)
    }

    /// Manually finish the race: Running → Finished. Returns the snapshot
    /// to archive.
    pub fn finish(&mut self) -> Result<RaceSnapshot> {
        if self.state != SessionState::Running {
            return Err(RaceError::state("finish", self.state));
        }
        self.finish_at(self.time.now_ms());
        Ok(self.snapshot())
    }

    /// Serialized state of this session, keyed by its id.
    ///
    /// Meaningful once Finished; callable earlier for inspection.
    pub fn snapshot(&self) -> RaceSnapshot {
        let id =
            self.id.clone().unwrap_or_else(|| SessionId::mint(self.clock.start_ms));
        RaceSnapshot {
            id,
            metadata: self.metadata.clone(),
            config: self.config,
            clock: self.clock,
            records: self.ledger.records().to_vec(),
        }
    }

    fn finish_at(&mut self, now_ms: u64) {
        self.clock.finish(now_ms);
        self.state = SessionState::Finished;
        info!(
            id = %self.id.as_ref().map(SessionId::to_string).unwrap_or_default(),
            elapsed_ms = self.clock.elapsed_ms(),
            "race finished"
        );
    }

    fn edit_config(
        &mut self,
        command: &'static str,
        apply: impl FnOnce(&mut RaceConfig),
    ) -> Result<()> {
        if self.state == SessionState::Running {
            return Err(RaceError::state(command, self.state));
        }

        apply(&mut self.config);
        // Any config edit resets the session to a clean Configuring state.
        self.state = SessionState::Configuring;
        self.clock.reset();
        self.ledger.initialize(&self.config);
        self.id = None;
        self.metadata.race_date_ms = 0;
        Ok(())
    }
}
