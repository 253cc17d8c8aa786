//! Error types for the respool system.
//!
//! Errors are grouped by subsystem. The root error type, `Error`, wraps
//! each subsystem error so callers can handle everything uniformly at the
//! top level.
//!
//! Note that an exhausted pool is *not* an error: a non-blocking acquire
//! simply yields nothing. Only a blocking acquire that gives up after its
//! configured timeout reports [`PoolError::PoolExhausted`].

use crate::id::ResourceId;
use crate::types::WorkerState;
use std::time::Duration;
use thiserror::Error;

/// Root error type for the respool system.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource pool errors
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    /// Worker lifecycle errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the resource pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A blocking acquire gave up after waiting for the configured timeout
    #[error("resource pool exhausted after waiting {0:?}")]
    PoolExhausted(Duration),

    /// A release that does not match a resource checked out from this pool
    #[error("protocol violation on resource {resource}: {reason}")]
    ProtocolViolation {
        /// The resource that was handed back
        resource: ResourceId,

        /// What was wrong with the release
        reason: String,
    },
}

/// Errors raised while driving a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker was asked to move to a state it cannot reach
    #[error("invalid worker transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: WorkerState,

        /// Requested state
        to: WorkerState,
    },

    /// The work performed while holding a resource failed
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// The worker thread panicked
    #[error("worker {0} panicked")]
    Panicked(String),
}

/// Errors related to loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type used throughout the respool system.
pub type Result<T> = std::result::Result<T, Error>;
