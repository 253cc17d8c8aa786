//! Configuration for the pool, its workers and the demonstration scenario.
//!
//! Every structure deserializes from TOML with defaults for missing keys,
//! so a configuration file only needs the values it changes:
//!
//! ```toml
//! workers = 8
//!
//! [pool]
//! max_instances = 2
//! setup_delay_ms = 250
//!
//! [pool.strategy]
//! kind = "poll"
//! interval_ms = 100
//! ```
//!
//! Durations are stored as whole milliseconds and exposed as
//! [`Duration`] through accessor methods.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How a blocked acquire waits for a resource to come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcquireStrategy {
    /// Sleep on a condition variable that is signalled on every release.
    #[default]
    Notify,

    /// Retry a non-blocking acquire after a fixed interval.
    Poll {
        /// Time between attempts, in milliseconds
        interval_ms: u64,
    },
}

impl AcquireStrategy {
    /// Polling strategy with the given interval, rounded up to whole
    /// milliseconds. A zero interval stays zero and fails validation.
    pub fn poll(interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        Self::Poll {
            interval_ms: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }
}

/// Configuration for a resource pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of resources the pool will ever create
    pub max_instances: usize,

    /// Simulated setup cost of each new resource, in milliseconds
    pub setup_delay_ms: u64,

    /// Give up a blocking acquire after this many milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_ms: Option<u64>,

    /// How blocked acquires wait
    pub strategy: AcquireStrategy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_instances: 3,
            setup_delay_ms: 5_000,
            acquire_timeout_ms: None,
            strategy: AcquireStrategy::Notify,
        }
    }
}

impl PoolConfig {
    /// Setup cost of a new resource.
    pub fn setup_delay(&self) -> Duration {
        Duration::from_millis(self.setup_delay_ms)
    }

    /// Timeout for blocking acquires, `None` to wait forever.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_instances == 0 {
            return Err(ConfigError::Invalid(
                "pool.max_instances must be at least 1".to_string(),
            ));
        }
        if let AcquireStrategy::Poll { interval_ms: 0 } = self.strategy {
            return Err(ConfigError::Invalid(
                "pool.strategy.interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the simulated work a worker performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Length of one round of work, in milliseconds
    pub work_round_ms: u64,

    /// Rounds always played before the work may stop
    pub min_rounds: u32,

    /// Upper bound on the number of rounds
    pub max_rounds: u32,

    /// Chance of stopping after each round once `min_rounds` is reached
    pub stop_probability: f64,

    /// Seed for the work-length generator; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_round_ms: 1_000,
            min_rounds: 1,
            max_rounds: 10,
            stop_probability: 0.2,
            seed: None,
        }
    }
}

impl WorkerConfig {
    /// Length of one round of work.
    pub fn work_round(&self) -> Duration {
        Duration::from_millis(self.work_round_ms)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid(
                "worker.max_rounds must be at least 1".to_string(),
            ));
        }
        if self.min_rounds > self.max_rounds {
            return Err(ConfigError::Invalid(format!(
                "worker.min_rounds ({}) exceeds worker.max_rounds ({})",
                self.min_rounds, self.max_rounds
            )));
        }
        if !(0.0..=1.0).contains(&self.stop_probability) {
            return Err(ConfigError::Invalid(format!(
                "worker.stop_probability must be within [0, 1], got {}",
                self.stop_probability
            )));
        }
        Ok(())
    }
}

/// Configuration of the demonstration scenario: several workers started a
/// little apart, all sharing one pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Number of workers to start
    pub workers: usize,

    /// Delay between starting consecutive workers, in milliseconds
    pub stagger_ms: u64,

    /// Pool shared by all workers
    pub pool: PoolConfig,

    /// Work performed by each worker
    pub worker: WorkerConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            stagger_ms: 1_000,
            pool: PoolConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?)
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Delay between starting consecutive workers.
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid(
                "workers must be at least 1".to_string(),
            ));
        }
        self.pool.validate()?;
        self.worker.validate()
    }
}
