//! Core data types for race timing.
//!
//! - [`RaceConfig`] holds the runner and stage counts a race runs with
//! - [`Stage`] and [`SplitRecord`] form the per-runner split matrix
//! - [`SessionId`], [`RaceMetadata`] and [`RaceSnapshot`] are the archive
//!   key/value shapes
//! - [`format_hms`] renders millisecond durations for the display surface
//!
//! Stage times are `Option<u64>` milliseconds: an unrecorded stage is `None`,
//! and a recorded zero-duration split (`Some(0)`) stays distinguishable from
//! unset.

mod config;
mod snapshot;
mod split;
mod time_format;

pub use config::RaceConfig;
pub use snapshot::{RaceMetadata, RaceSnapshot, SessionId};
pub use split::{SplitRecord, Stage};
pub use time_format::format_hms;
