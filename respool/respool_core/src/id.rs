//! Strongly-typed identifiers.
//!
//! Resource identifiers are small sequence numbers handed out by a pool in
//! creation order, so they double as a high-water mark of how many
//! resources that pool has ever built. Pool identifiers are process-unique
//! and let a pool recognise resources that were checked out elsewhere.
//!
//! # Examples
//!
//! ```
//! use respool_core::id::{PoolId, ResourceId};
//!
//! let first = ResourceId::new(1);
//! let second = first.next();
//! assert!(first < second);
//! assert_eq!(second.to_string(), "2");
//!
//! assert_ne!(PoolId::new(), PoolId::new());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a pooled resource, unique within its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Wrap a raw sequence number.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The identifier following this one in creation order.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The raw sequence number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Process-unique identifier of a resource pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(u64);

impl PoolId {
    /// Allocate a fresh pool identifier.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool-{}", self.0)
    }
}

/// Label of a unit of work, such as `M1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    /// Create a worker label from any string.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Label used by the demonstration scenario for the worker at `index`
    /// (zero-based): `M1`, `M2`, ...
    pub fn numbered(index: usize) -> Self {
        Self(format!("M{}", index + 1))
    }

    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}
