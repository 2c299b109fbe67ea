//! Retention policy: the byte and element ceilings bounding the window.

use serde::{Deserialize, Serialize};

/// Default byte ceiling (8 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 8 * 1024 * 1024;

/// Bounds how much of the window is retained.
///
/// A limit of zero means "unset". At least one limit must be set before a pool
/// will start, since an unbounded window would grow without limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Maximum cumulative footprint of retained elements, in bytes.
    pub max_bytes: u64,
    /// Maximum number of retained elements.
    pub max_count: usize,
}

impl RetentionPolicy {
    /// Policy bounded only by element count.
    #[must_use]
    pub fn by_count(max_count: usize) -> Self {
        Self {
            max_bytes: 0,
            max_count,
        }
    }

    /// Policy bounded only by byte footprint.
    #[must_use]
    pub fn by_bytes(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            max_count: 0,
        }
    }

    /// Set max bytes.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set max count.
    #[must_use]
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// True iff at least one limit is set.
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        self.max_bytes > 0 || self.max_count > 0
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::by_bytes(DEFAULT_MAX_BYTES)
    }
}
