//! The per-runner, per-stage split ledger.
//!
//! `SplitLedger` owns one [`SplitRecord`] per configured runner and
//! implements the two algorithms at the heart of the system:
//!
//! - **recording**: a split always fills the runner's *first unset* stage,
//!   so stages complete strictly in ascending id order no matter how the
//!   operator times their taps. The stored value is the segment duration —
//!   elapsed race time minus the sum of the runner's previously recorded
//!   segments — so each stage carries its own duration, not a cumulative.
//! - **undo**: clears the runner's *last set* stage back to unset. Undo only
//!   clears the slot; derived totals are recomputed from set stages on read,
//!   so nothing else needs shifting.
//!
//! Double-actions (splitting a finished runner, undoing an empty record)
//! are expected operator input and come back as no-change outcomes, not
//! errors.

use serde::{Deserialize, Serialize};

use crate::error::{RaceError, Result};
use crate::types::{RaceConfig, SplitRecord};

/// Result of a split recording attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    /// A stage was filled; the runner's updated record is returned
    Recorded(SplitRecord),

    /// Every stage for this runner was already set; nothing changed
    AlreadyFinished,
}

/// Result of an undo attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The runner's last set stage was cleared; the updated record is returned
    Cleared(SplitRecord),

    /// No stage was set for this runner; nothing changed
    NothingToUndo,
}

/// The split matrix for one race: one record per runner, ascending runner
/// order, every record sized to the configured stage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLedger {
    records: Vec<SplitRecord>,
}

impl SplitLedger {
    /// An empty ledger (no runners). Matches a default config; call
    /// [`initialize`](Self::initialize) before recording.
    pub fn empty() -> Self {
        Self { records: Vec::new() }
    }

    /// Replace the ledger with fresh all-unset records for the given config.
    ///
    /// Called whenever the config changes or a race (re)starts. Every stage
    /// slot is created eagerly here, so no recording path ever grows a
    /// record lazily.
    pub fn initialize(&mut self, config: &RaceConfig) {
        self.records =
            (1..=config.runners).map(|runner| SplitRecord::new(runner, config.stages)).collect();
    }

    /// Record a split for `runner` at cumulative race time `elapsed_ms`.
    ///
    /// Fills the runner's first unset stage with the segment duration
    /// `elapsed_ms - total_ms()`, saturating at zero if the host clock read
    /// went backwards relative to already-recorded segments.
    pub fn record_split(&mut self, runner: u32, elapsed_ms: u64) -> Result<SplitOutcome> {
        let record = self.record_mut(runner)?;

        let Some(next_id) = record.first_unset().map(|stage| stage.id) else {
            return Ok(SplitOutcome::AlreadyFinished);
        };

        let segment = elapsed_ms.saturating_sub(record.total_ms());
        let slot = &mut record.stages[(next_id - 1) as usize];
        slot.time = Some(segment);

        Ok(SplitOutcome::Recorded(record.clone()))
    }

    /// Clear the last recorded stage for `runner`.
    pub fn undo_last_split(&mut self, runner: u32) -> Result<UndoOutcome> {
        let record = self.record_mut(runner)?;

        let Some(last_id) = record.last_set().map(|stage| stage.id) else {
            return Ok(UndoOutcome::NothingToUndo);
        };

        let slot = &mut record.stages[(last_id - 1) as usize];
        slot.time = None;

        Ok(UndoOutcome::Cleared(record.clone()))
    }

    /// Whether every stage for `runner` is set
    pub fn has_finished(&self, runner: u32) -> Result<bool> {
        Ok(self.record(runner)?.is_finished())
    }

    /// Whether every runner has finished every stage.
    ///
    /// False for an uninitialized (zero-runner) ledger: a race with no one
    /// in it never auto-finishes.
    pub fn all_finished(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(SplitRecord::is_finished)
    }

    /// Sum of recorded segment durations for `runner`, in milliseconds
    pub fn total_for(&self, runner: u32) -> Result<u64> {
        Ok(self.record(runner)?.total_ms())
    }

    /// All records, ascending runner order
    pub fn records(&self) -> &[SplitRecord] {
        &self.records
    }

    /// Number of runners in the ledger
    pub fn runner_count(&self) -> u32 {
        self.records.len() as u32
    }

    fn record(&self, runner: u32) -> Result<&SplitRecord> {
        let runners = self.runner_count();
        if runner == 0 || runner > runners {
            return Err(RaceError::unknown_runner(runner, runners));
        }
        Ok(&self.records[(runner - 1) as usize])
    }

    fn record_mut(&mut self, runner: u32) -> Result<&mut SplitRecord> {
        let runners = self.runner_count();
        if runner == 0 || runner > runners {
            return Err(RaceError::unknown_runner(runner, runners));
        }
        Ok(&mut self.records[(runner - 1) as usize])
    }
}

impl Default for SplitLedger {
    fn default() -> Self {
        Self::empty()
    }
}
