#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # respool concurrency
//!
//! A bounded pool of expensive resources shared by concurrent workers.
//!
//! - **pool**: [`ResourcePool`] creates resources lazily up to a cap,
//!   reuses released ones first (oldest release first), and lets callers
//!   either try once or block until a resource comes back
//! - **worker**: [`Worker`] waits for a resource, works with it for a
//!   randomized number of rounds, and always hands it back
//! - **scenario**: [`Scenario`] starts several staggered workers on one
//!   shared pool and summarizes the run
//!
//! ```
//! use respool_concurrency::ResourcePool;
//! use respool_core::config::PoolConfig;
//!
//! let pool = ResourcePool::new(PoolConfig {
//!     max_instances: 1,
//!     setup_delay_ms: 0,
//!     ..PoolConfig::default()
//! })
//! .unwrap();
//!
//! let table = pool.try_acquire().unwrap();
//! assert!(pool.try_acquire().is_none());
//!
//! let id = table.id();
//! pool.release(table).unwrap();
//! assert_eq!(pool.try_acquire().unwrap().id(), id);
//! ```

/// Resource pooling and reuse
pub mod pool;

/// The staggered-workers demonstration
pub mod scenario;

/// Units of work that borrow pooled resources
pub mod worker;

pub use pool::{PoolStats, Resource, ResourceHandle, ResourcePool};
pub use scenario::{Scenario, ScenarioReport};
pub use worker::{WorkReport, Worker};
