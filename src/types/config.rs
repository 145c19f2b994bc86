//! Race configuration: how many runners, how many stages

use serde::{Deserialize, Serialize};

/// Runner and stage counts for one race.
///
/// Values of zero are storable (an operator can clear an input field) but a
/// race cannot start until both counts are at least one. The lifecycle lock
/// (no edits while a race runs) is enforced by `RaceSession`, which owns the
/// config; the value itself is plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Number of participating runners, numbered 1..=runners
    pub runners: u32,

    /// Number of stages every runner must complete
    pub stages: u32,
}

impl RaceConfig {
    /// Create a config with the given counts
    pub fn new(runners: u32, stages: u32) -> Self {
        Self { runners, stages }
    }

    /// Replace the runner count
    pub fn set_runners(&mut self, runners: u32) {
        self.runners = runners;
    }

    /// Replace the stage count
    pub fn set_stages(&mut self, stages: u32) {
        self.stages = stages;
    }

    /// A race may start iff both counts are at least one
    pub fn is_valid(&self) -> bool {
        self.runners >= 1 && self.stages >= 1
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self { runners: 0, stages: 0 }
    }
}
