//! Per-runner split records

use serde::{Deserialize, Serialize};

/// One leg of a race for one runner.
///
/// `time` is the segment duration in milliseconds: the time this runner
/// spent on this stage alone, not cumulative race time. `None` means the
/// stage has not been recorded yet; `Some(0)` is a legitimate zero-duration
/// split and must never be conflated with unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage number, 1-based and stable for the life of the record
    pub id: u32,

    /// Recorded segment duration in milliseconds, if any
    pub time: Option<u64>,
}

impl Stage {
    /// An unset stage slot with the given id
    pub fn unset(id: u32) -> Self {
        Self { id, time: None }
    }

    /// Whether a segment duration has been recorded
    pub fn is_set(&self) -> bool {
        self.time.is_some()
    }
}

/// All stage slots for one runner.
///
/// Slots are created eagerly when the ledger initializes, one per configured
/// stage in ascending id order, so every slot exists before the first split
/// is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// Runner number, 1-based, unique within one session
    pub runner: u32,

    /// Stage slots in ascending id order, length fixed by the config
    pub stages: Vec<Stage>,
}

impl SplitRecord {
    /// A fresh record with `stage_count` unset slots
    pub fn new(runner: u32, stage_count: u32) -> Self {
        let stages = (1..=stage_count).map(Stage::unset).collect();
        Self { runner, stages }
    }

    /// The lowest-id stage without a recorded time
    pub fn first_unset(&self) -> Option<&Stage> {
        self.stages.iter().find(|stage| !stage.is_set())
    }

    /// The highest-id stage with a recorded time
    pub fn last_set(&self) -> Option<&Stage> {
        self.stages.iter().rev().find(|stage| stage.is_set())
    }

    /// Whether every stage has a recorded time
    pub fn is_finished(&self) -> bool {
        self.stages.iter().all(Stage::is_set)
    }

    /// Sum of all recorded segment durations, in milliseconds.
    ///
    /// Mid-race this is the runner's time over completed stages; once the
    /// runner is finished it is their total race time.
    pub fn total_ms(&self) -> u64 {
        self.stages.iter().filter_map(|stage| stage.time).sum()
    }
}
