//! # respool core
//!
//! `respool_core` holds the pieces shared by every respool crate: the error
//! hierarchy, identifier types, the worker state machine, configuration,
//! and logging utilities.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all respool components
//! - **id**: Resource, pool and worker identifiers
//! - **types**: Data types shared between the pool and its workers
//! - **config**: Pool, worker and scenario configuration
//! - **utils**: Logging helpers

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod id;
pub mod types;
pub mod utils;

pub use config::{AcquireStrategy, PoolConfig, ScenarioConfig, WorkerConfig};
pub use error::{ConfigError, Error, PoolError, Result, WorkerError};
pub use id::{PoolId, ResourceId, WorkerId};
pub use types::WorkerState;
pub use utils::LogLevel;
