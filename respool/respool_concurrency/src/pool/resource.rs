//! Pooled resources and scoped handles to them.
//!
//! A [`Resource`] is expensive to build and cheap to keep: the pool pays its
//! setup cost once and then hands the same resource out again and again.
//! A [`ResourceHandle`] ties a checked-out resource to its pool and returns
//! it when dropped, so work that fails or panics cannot leak it.

use super::resource_pool::ResourcePool;
use log::{info, warn};
use respool_core::error::PoolError;
use respool_core::id::{PoolId, ResourceId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A reusable resource owned by a [`ResourcePool`].
///
/// Cloning a resource does not create a new one; the clone names the same
/// pooled resource. Every checkout stamps the resource with a fresh lease,
/// and the pool only accepts a release carrying the current one, so a
/// stale copy can never hand back a resource someone else now holds.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Sequence number assigned by the pool
    id: ResourceId,

    /// Pool that created this resource
    pool: PoolId,

    /// Checkout this copy belongs to
    lease: u64,
}

impl Resource {
    /// Build a resource, paying the full setup cost on the calling thread.
    pub(crate) fn set_up(id: ResourceId, pool: PoolId, lease: u64, setup_delay: Duration) -> Self {
        info!("Setting up resource {}", id);
        if !setup_delay.is_zero() {
            thread::sleep(setup_delay);
        }
        info!("Resource {} ready after {:?}", id, setup_delay);

        Self { id, pool, lease }
    }

    /// Identifier of this resource within its pool.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Pool this resource belongs to.
    pub fn pool_id(&self) -> PoolId {
        self.pool
    }

    pub(crate) fn lease(&self) -> u64 {
        self.lease
    }

    pub(crate) fn renew(&mut self, lease: u64) {
        self.lease = lease;
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource {} of {}", self.id, self.pool)
    }
}

/// A checked-out resource that goes back to its pool when dropped.
pub struct ResourceHandle {
    /// The resource itself
    resource: Resource,

    /// Pool the resource is returned to
    pool: Arc<ResourcePool>,

    /// When this resource was acquired
    acquired_at: Instant,

    /// Set once the resource has been handed back explicitly
    released: bool,
}

impl ResourceHandle {
    pub(crate) fn new(resource: Resource, pool: Arc<ResourcePool>) -> Self {
        Self {
            resource,
            pool,
            acquired_at: Instant::now(),
            released: false,
        }
    }

    /// Get a reference to the resource
    pub fn get(&self) -> &Resource {
        &self.resource
    }

    /// Get the time since this resource was acquired
    pub fn held_duration(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Return the resource to the pool now, reporting any protocol
    /// violation instead of only logging it as `drop` does.
    pub fn release(mut self) -> Result<(), PoolError> {
        self.released = true;
        self.pool.release(self.resource.clone())
    }
}

impl Deref for ResourceHandle {
    type Target = Resource;

    fn deref(&self) -> &Resource {
        &self.resource
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.pool.release(self.resource.clone()) {
            warn!("Failed to return resource {} on drop: {}", self.resource.id, e);
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.released {
            write!(f, "ResourceHandle(released)")
        } else {
            write!(f, "ResourceHandle({:?})", self.resource)
        }
    }
}
