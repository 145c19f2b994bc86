//! Race clock state and the time source seam.
//!
//! `RaceClock` is plain data: wall-clock milliseconds for start and current
//! time plus running/finished flags. It never reads the host clock itself —
//! callers feed it instants obtained from a [`TimeSource`], which keeps the
//! whole state machine deterministic under test.

use serde::{Deserialize, Serialize};

/// Source of wall-clock time in epoch milliseconds.
///
/// The production implementation is [`SystemTimeSource`]; tests substitute a
/// manually stepped source so elapsed times are exact.
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time in milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// `TimeSource` backed by `std::time::SystemTime`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually stepped `TimeSource` for deterministic tests and replays.
///
/// Interior atomic so a single instance can be shared with a session and
/// stepped from the outside.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: std::sync::atomic::AtomicU64,
}

impl ManualTimeSource {
    /// A source pinned at `now_ms`
    pub fn at(now_ms: u64) -> Self {
        Self { now: std::sync::atomic::AtomicU64::new(now_ms) }
    }

    /// Jump to an absolute instant
    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, std::sync::atomic::Ordering::SeqCst);
    }

    /// Step forward by `delta_ms`
    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, std::sync::atomic::Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Start/current instants and lifecycle flags for one race.
///
/// `elapsed_ms` is the authoritative race duration at any point:
/// `current - start`, saturating at zero so a host clock stepping backwards
/// can never produce a negative display value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceClock {
    /// Wall-clock start instant, epoch ms. Zero until started.
    pub start_ms: u64,

    /// Most recent wall-clock read, epoch ms. Zero until started.
    pub current_ms: u64,

    /// True while the race is being timed
    pub is_running: bool,

    /// True once the race has finished
    pub is_finished: bool,
}

impl RaceClock {
    /// A zeroed, idle clock
    pub fn new() -> Self {
        Self { start_ms: 0, current_ms: 0, is_running: false, is_finished: false }
    }

    /// Begin timing at `now_ms`. Start and current coincide at this instant.
    pub fn start(&mut self, now_ms: u64) {
        self.start_ms = now_ms;
        self.current_ms = now_ms;
        self.is_running = true;
        self.is_finished = false;
    }

    /// Advance the current instant. Ignored unless running, so a stray late
    /// tick can never move a stopped clock.
    pub fn advance(&mut self, now_ms: u64) {
        if self.is_running {
            self.current_ms = now_ms;
        }
    }

    /// Stop timing at `now_ms` and mark the race finished.
    pub fn finish(&mut self, now_ms: u64) {
        if self.is_running {
            self.current_ms = now_ms;
        }
        self.is_running = false;
        self.is_finished = true;
    }

    /// Reset to the zeroed idle state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Elapsed race time in milliseconds, clamped at zero
    pub fn elapsed_ms(&self) -> u64 {
        self.current_ms.saturating_sub(self.start_ms)
    }
}

impl Default for RaceClock {
    fn default() -> Self {
        Self::new()
    }
}
