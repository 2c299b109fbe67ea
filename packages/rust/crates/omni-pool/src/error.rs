//! Error types for pool construction and read sessions.
//!
//! Follows ODF-REP: Library crates use `thiserror` for explicit error enums.

use std::fmt;

use thiserror::Error;

/// Where a read session was when the pool shut down underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    /// Waiting on the wait-gate for new data.
    Parked,
    /// Waiting for room in, or sitting in, the coordinator's request queue.
    Queued,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parked => f.write_str("waiting for data"),
            Self::Queued => f.write_str("queued for service"),
        }
    }
}

/// Pool-level errors.
///
/// Cancellation is not an error: a cancelled session or feed just stops.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Invalid configuration, e.g. a retention policy with no limits.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The pool shut down while the session was parked or queued.
    #[error("Session aborted while {0}: pool has shut down")]
    SessionAborted(SessionStage),

    /// Reading a config file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A config document could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
