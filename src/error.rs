//! Error types for race timing operations.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The taxonomy follows the session lifecycle:
//!
//! - **Config Errors**: a start was attempted with an invalid configuration
//! - **State Errors**: a command is not legal in the session's current
//!   lifecycle state (e.g. editing the config mid-race)
//! - **Runner Errors**: a command referenced a runner outside the current
//!   configuration
//! - **Persistence Errors**: the archive backend failed to read or write
//!
//! Operator double-actions — splitting a runner who has already finished,
//! undoing when nothing is recorded — are deliberately *not* errors. They
//! are expected input and surface as no-change outcomes
//! ([`SplitOutcome::AlreadyFinished`](crate::SplitOutcome),
//! [`UndoOutcome::NothingToUndo`](crate::UndoOutcome)).
//!
//! Persistence failures are the only class the core treats as non-fatal at
//! the session level: a failed archive write is logged and surfaced as a
//! warning, never rolled back into in-memory session state.

use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for race timing operations.
pub type Result<T, E = RaceError> = std::result::Result<T, E>;

/// Main error type for race timing operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RaceError {
    #[error("Invalid race configuration: {runners} runners, {stages} stages (both must be >= 1)")]
    InvalidConfig { runners: u32, stages: u32 },

    #[error("Unknown runner {runner} (configured runners: 1..={runners})")]
    UnknownRunner { runner: u32, runners: u32 },

    #[error("Cannot {command} while session is {state:?}")]
    State { command: &'static str, state: SessionState },

    #[error("Session driver has shut down")]
    Closed,

    #[error("Archive {operation} failed: {context}")]
    Persistence {
        operation: &'static str,
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RaceError {
    /// Returns whether retrying the same command can succeed.
    ///
    /// Only persistence failures qualify: the in-memory session is intact
    /// and the archive write can be attempted again. Everything else is an
    /// operator-input problem that needs a different command, not a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RaceError::Persistence { .. } => true,
            RaceError::InvalidConfig { .. } => false,
            RaceError::UnknownRunner { .. } => false,
            RaceError::State { .. } => false,
            RaceError::Closed => false,
        }
    }

    /// Helper constructor for state violations.
    pub fn state(command: &'static str, state: SessionState) -> Self {
        RaceError::State { command, state }
    }

    /// Helper constructor for unknown-runner references.
    pub fn unknown_runner(runner: u32, runners: u32) -> Self {
        RaceError::UnknownRunner { runner, runners }
    }

    /// Helper constructor for persistence failures.
    pub fn persistence(operation: &'static str, context: impl Into<String>) -> Self {
        RaceError::Persistence { operation, context: context.into(), source: None }
    }

    /// Helper constructor for persistence failures with an underlying cause.
    pub fn persistence_with_source(
        operation: &'static str,
        context: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RaceError::Persistence { operation, context: context.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for RaceError {
    fn from(err: std::io::Error) -> Self {
        RaceError::Persistence {
            operation: "io",
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for RaceError {
    fn from(err: serde_json::Error) -> Self {
        RaceError::Persistence {
            operation: "serialize",
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
