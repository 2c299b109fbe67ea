//! Pool configuration: retention policy plus channel capacities.
//!
//! Loads from YAML, e.g.
//!
//! ```yaml
//! policy:
//!   max_count: 1024
//! request_capacity: 16
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};
use crate::policy::RetentionPolicy;

/// Default capacity of the element-arrival channel.
pub const DEFAULT_FEED_CAPACITY: usize = 64;
/// Default capacity of the read-request channel.
pub const DEFAULT_REQUEST_CAPACITY: usize = 10;
/// Default capacity of each reader's output stream.
pub const DEFAULT_SINK_CAPACITY: usize = 1;

/// Settings for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Retention ceilings. Must be constrained.
    pub policy: RetentionPolicy,
    /// Elements that may wait for the coordinator before feeds block.
    pub feed_capacity: usize,
    /// Read requests that may wait for the coordinator before submitters block.
    pub request_capacity: usize,
    /// Elements buffered per reader before delivery waits on the consumer.
    pub sink_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            policy: RetentionPolicy::default(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
            sink_capacity: DEFAULT_SINK_CAPACITY,
        }
    }
}

impl PoolConfig {
    /// Config with the given policy and default capacities.
    #[must_use]
    pub fn with_policy(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// `Parse` if it is not valid YAML for this shape, `Configuration` if it fails
    /// [`PoolConfig::validate`].
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Parse` if it is not valid YAML for this shape,
    /// `Configuration` if it fails [`PoolConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Reject configurations a pool cannot start with.
    ///
    /// # Errors
    ///
    /// `Configuration` if the retention policy sets no limit.
    pub fn validate(&self) -> Result<()> {
        if !self.policy.is_constrained() {
            return Err(PoolError::Configuration(
                "retention policy is unconstrained; set max_bytes or max_count".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy with every channel capacity raised to at least one.
    #[must_use]
    pub(crate) fn normalized(mut self) -> Self {
        self.feed_capacity = self.feed_capacity.max(1);
        self.request_capacity = self.request_capacity.max(1);
        self.sink_capacity = self.sink_capacity.max(1);
        self
    }
}
