//! A bounded pool of expensive, reusable resources.
//!
//! The pool creates resources lazily, never more than
//! [`PoolConfig::max_instances`], and always prefers handing out an idle
//! resource over building a new one. Idle resources are reused in the order
//! they were released.
//!
//! All bookkeeping (idle queue, checked-out set, creation counter) lives
//! behind one mutex. Creating a resource reserves its identifier and slot
//! inside that critical section, but the setup cost is paid after the lock
//! is dropped so releases are never stuck behind a slow construction. A
//! reserved slot counts as checked out, which keeps
//! `created == idle + held` true at every point the lock can observe.
//!
//! Each checkout is recorded under a fresh lease number. A release is only
//! accepted when it carries the lease currently recorded for that resource.

use super::resource::{Resource, ResourceHandle};
use log::{debug, info, trace, warn};
use parking_lot::{Condvar, Mutex};
use respool_core::config::{AcquireStrategy, PoolConfig};
use respool_core::error::{ConfigError, PoolError};
use respool_core::id::{PoolId, ResourceId};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Snapshot of a pool's bookkeeping, taken under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Configured instance cap
    pub max_instances: usize,

    /// Resources created so far, including any still being set up
    pub created: usize,

    /// Resources waiting in the pool
    pub idle: usize,

    /// Resources currently checked out
    pub held: usize,

    /// Largest number of resources checked out at once
    pub peak_held: usize,
}

impl PoolStats {
    /// Check the pool invariants: the cap is respected and every created
    /// resource is either idle or held.
    pub fn is_consistent(&self) -> bool {
        self.created <= self.max_instances && self.created == self.idle + self.held
    }
}

/// What the pool decided to hand out.
enum Grant {
    /// An idle resource, ready to use
    Reuse(Resource),

    /// A reserved slot for a resource that still has to be set up
    Create {
        id: ResourceId,
        lease: u64,
    },
}

/// Bookkeeping guarded by the pool lock.
struct PoolState {
    /// Released resources, earliest release first
    idle: VecDeque<Resource>,

    /// Lease of every resource currently checked out
    held: HashMap<ResourceId, u64>,

    /// Lease handed to the next checkout
    next_lease: u64,

    /// Number of resources created (or reserved) so far
    created: usize,

    /// Largest size `held` has reached
    peak_held: usize,
}

impl PoolState {
    fn new(max_instances: usize) -> Self {
        Self {
            idle: VecDeque::with_capacity(max_instances),
            held: HashMap::with_capacity(max_instances),
            next_lease: 1,
            created: 0,
            peak_held: 0,
        }
    }

    /// Take the earliest-released idle resource, or reserve a new one if
    /// the cap allows it.
    fn grant(&mut self, max_instances: usize) -> Option<Grant> {
        let lease = self.next_lease;
        let grant = if let Some(mut resource) = self.idle.pop_front() {
            resource.renew(lease);
            self.held.insert(resource.id(), lease);
            Grant::Reuse(resource)
        } else if self.created < max_instances {
            self.created += 1;
            let id = ResourceId::new(self.created as u64);
            self.held.insert(id, lease);
            Grant::Create { id, lease }
        } else {
            return None;
        };
        self.next_lease += 1;

        self.peak_held = self.peak_held.max(self.held.len());
        Some(grant)
    }

    fn idle_ids(&self) -> Vec<ResourceId> {
        self.idle.iter().map(Resource::id).collect()
    }
}

/// A pool of reusable resources.
pub struct ResourcePool {
    /// Identity used to recognise our own resources on release
    id: PoolId,

    /// Configuration for this pool
    config: PoolConfig,

    /// Idle queue, checked-out set and counters
    state: Mutex<PoolState>,

    /// Signalled whenever a resource is released
    returned: Condvar,
}

impl ResourcePool {
    /// Create a new, empty resource pool with the specified configuration.
    ///
    /// Nothing is set up until the first acquire. A configuration that
    /// could never hand out a resource is rejected.
    pub fn new(config: PoolConfig) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let id = PoolId::new();
        info!(
            "Created {} with room for {} resources",
            id, config.max_instances
        );

        Ok(Arc::new(Self {
            id,
            state: Mutex::new(PoolState::new(config.max_instances)),
            config,
            returned: Condvar::new(),
        }))
    }

    /// Identifier of this pool.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Try to acquire a resource without waiting.
    ///
    /// Returns the earliest-released idle resource if there is one, else a
    /// newly set up resource if the cap has not been reached, else `None`.
    /// Setting up a new resource blocks the caller for the setup delay.
    pub fn try_acquire(&self) -> Option<Resource> {
        let grant = self.state.lock().grant(self.config.max_instances);
        grant.map(|grant| self.fulfil(grant))
    }

    /// Acquire a resource, waiting for one to be released if necessary.
    ///
    /// Waits forever unless the pool was configured with an acquire
    /// timeout, in which case [`PoolError::PoolExhausted`] is returned once
    /// it expires.
    pub fn acquire(&self) -> Result<Resource, PoolError> {
        self.acquire_within(self.config.acquire_timeout())
    }

    /// Acquire a resource, giving up after `timeout` (`None` waits forever).
    pub fn acquire_within(&self, timeout: Option<Duration>) -> Result<Resource, PoolError> {
        let started = Instant::now();
        let deadline = timeout.map(|timeout| started + timeout);

        let grant = match self.config.strategy {
            AcquireStrategy::Notify => self.wait_for_release(deadline),
            AcquireStrategy::Poll { interval_ms } => {
                self.poll_for_release(Duration::from_millis(interval_ms), deadline)
            }
        };

        match grant {
            Some(grant) => Ok(self.fulfil(grant)),
            None => {
                let waited = started.elapsed();
                debug!("Gave up waiting for a resource after {:?}", waited);
                Err(PoolError::PoolExhausted(waited))
            }
        }
    }

    /// Acquire a resource wrapped in a handle that returns it on drop.
    pub fn acquire_handle(self: &Arc<Self>) -> Result<ResourceHandle, PoolError> {
        let resource = self.acquire()?;
        Ok(ResourceHandle::new(resource, Arc::clone(self)))
    }

    /// Non-blocking variant of [`ResourcePool::acquire_handle`].
    pub fn try_acquire_handle(self: &Arc<Self>) -> Option<ResourceHandle> {
        self.try_acquire()
            .map(|resource| ResourceHandle::new(resource, Arc::clone(self)))
    }

    /// Return a resource to the pool.
    ///
    /// The resource must come from the current checkout of one of this
    /// pool's resources. Foreign resources, repeated releases and stale
    /// copies from an earlier checkout are reported as protocol violations
    /// and leave the pool untouched.
    pub fn release(&self, resource: Resource) -> Result<(), PoolError> {
        let id = resource.id();

        if resource.pool_id() != self.id {
            let reason = format!("resource belongs to {}, not {}", resource.pool_id(), self.id);
            warn!("Rejected release of resource {}: {}", id, reason);
            return Err(PoolError::ProtocolViolation {
                resource: id,
                reason,
            });
        }

        let mut available = {
            let mut state = self.state.lock();
            let current = state.held.get(&id).copied();
            if current != Some(resource.lease()) {
                drop(state);
                let reason = match current {
                    Some(_) => "resource is checked out under a newer lease".to_string(),
                    None => "resource is not checked out".to_string(),
                };
                warn!("Rejected release of resource {}: {}", id, reason);
                return Err(PoolError::ProtocolViolation {
                    resource: id,
                    reason,
                });
            }
            state.held.remove(&id);
            state.idle.push_back(resource);
            state.idle_ids()
        };
        self.returned.notify_one();

        available.sort();
        info!(
            "Resource {} released. Available resources: {}",
            id,
            available
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(())
    }

    /// Snapshot of the pool bookkeeping.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            max_instances: self.config.max_instances,
            created: state.created,
            idle: state.idle.len(),
            held: state.held.len(),
            peak_held: state.peak_held,
        }
    }

    /// Identifiers of the idle resources, in the order they will be reused.
    pub fn idle_ids(&self) -> Vec<ResourceId> {
        self.state.lock().idle_ids()
    }

    /// Get the current number of available resources
    pub fn available_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Get the total number of resources created (available + in use)
    pub fn total_count(&self) -> usize {
        self.state.lock().created
    }

    fn fulfil(&self, grant: Grant) -> Resource {
        match grant {
            Grant::Reuse(resource) => {
                debug!("Reusing resource {}", resource.id());
                resource
            }
            Grant::Create { id, lease } => {
                Resource::set_up(id, self.id, lease, self.config.setup_delay())
            }
        }
    }

    /// Sleep on the release signal until a grant is possible or the
    /// deadline passes.
    fn wait_for_release(&self, deadline: Option<Instant>) -> Option<Grant> {
        let mut state = self.state.lock();
        loop {
            if let Some(grant) = state.grant(self.config.max_instances) {
                return Some(grant);
            }

            trace!("No resource available, waiting for a release");
            match deadline {
                Some(deadline) => {
                    if self.returned.wait_until(&mut state, deadline).timed_out() {
                        return state.grant(self.config.max_instances);
                    }
                }
                None => self.returned.wait(&mut state),
            }
        }
    }

    /// Retry a non-blocking grant every `interval` until one succeeds or
    /// the deadline passes.
    fn poll_for_release(&self, interval: Duration, deadline: Option<Instant>) -> Option<Grant> {
        loop {
            let grant = self.state.lock().grant(self.config.max_instances);
            if grant.is_some() {
                return grant;
            }

            let pause = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    remaining.min(interval)
                }
                None => interval,
            };
            trace!("No resource available, retrying in {:?}", pause);
            thread::sleep(pause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_instances: usize) -> PoolConfig {
        PoolConfig {
            max_instances,
            setup_delay_ms: 0,
            ..PoolConfig::default()
        }
    }

    #[test]
    fn test_single_resource_is_reused() {
        let pool = ResourcePool::new(config(1)).unwrap();

        let first = pool.try_acquire().unwrap();
        assert_eq!(first.id(), ResourceId::new(1));
        pool.release(first).unwrap();

        let second = pool.try_acquire().unwrap();
        assert_eq!(second.id(), ResourceId::new(1));
        assert_eq!(pool.total_count(), 1);
    }

    #[test]
    fn test_cap_yields_none() {
        let pool = ResourcePool::new(config(2)).unwrap();

        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.total_count(), 2);

        pool.release(a).unwrap();
        pool.release(b).unwrap();
        assert_eq!(pool.available_count(), 2);
    }

    #[test]
    fn test_ids_increase_in_creation_order() {
        let pool = ResourcePool::new(config(3)).unwrap();
        let ids: Vec<_> = (0..3).map(|_| pool.try_acquire().unwrap().id()).collect();
        assert_eq!(
            ids,
            vec![ResourceId::new(1), ResourceId::new(2), ResourceId::new(3)]
        );
    }

    #[test]
    fn test_idle_resources_reused_in_release_order() {
        let pool = ResourcePool::new(config(3)).unwrap();
        let r1 = pool.try_acquire().unwrap();
        let r2 = pool.try_acquire().unwrap();
        let r3 = pool.try_acquire().unwrap();

        pool.release(r2).unwrap();
        pool.release(r3).unwrap();
        pool.release(r1).unwrap();
        assert_eq!(
            pool.idle_ids(),
            vec![ResourceId::new(2), ResourceId::new(3), ResourceId::new(1)]
        );

        assert_eq!(pool.try_acquire().unwrap().id(), ResourceId::new(2));
        assert_eq!(pool.try_acquire().unwrap().id(), ResourceId::new(3));
        assert_eq!(pool.try_acquire().unwrap().id(), ResourceId::new(1));
    }

    #[test]
    fn test_idle_resource_preferred_over_creation() {
        let pool = ResourcePool::new(config(3)).unwrap();
        let r1 = pool.try_acquire().unwrap();
        pool.release(r1).unwrap();

        let again = pool.try_acquire().unwrap();
        assert_eq!(again.id(), ResourceId::new(1));
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_double_release_is_protocol_violation() {
        let pool = ResourcePool::new(config(1)).unwrap();
        let resource = pool.try_acquire().unwrap();
        let copy = resource.clone();

        pool.release(resource).unwrap();
        let result = pool.release(copy);
        assert!(matches!(
            result,
            Err(PoolError::ProtocolViolation { resource, .. }) if resource == ResourceId::new(1)
        ));

        let stats = pool.stats();
        assert_eq!(stats.idle, 1);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_stale_copy_cannot_release_a_reissued_resource() {
        let pool = ResourcePool::new(config(1)).unwrap();
        let first = pool.try_acquire().unwrap();
        let stale = first.clone();
        pool.release(first).unwrap();

        let current = pool.try_acquire().unwrap();
        assert_eq!(current.id(), ResourceId::new(1));

        let result = pool.release(stale);
        assert!(matches!(
            result,
            Err(PoolError::ProtocolViolation { resource, .. }) if resource == ResourceId::new(1)
        ));

        let stats = pool.stats();
        assert_eq!(stats.held, 1);
        assert_eq!(stats.idle, 0);
        assert!(pool.try_acquire().is_none());

        pool.release(current).unwrap();
        assert_eq!(pool.idle_ids(), vec![ResourceId::new(1)]);
    }

    #[test]
    fn test_unusable_config_is_rejected() {
        let empty = ResourcePool::new(config(0));
        assert!(matches!(empty, Err(ConfigError::Invalid(_))));

        let spinning = ResourcePool::new(PoolConfig {
            strategy: AcquireStrategy::Poll { interval_ms: 0 },
            ..config(1)
        });
        assert!(matches!(spinning, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_foreign_release_is_protocol_violation() {
        let ours = ResourcePool::new(config(1)).unwrap();
        let theirs = ResourcePool::new(config(1)).unwrap();

        let foreign = theirs.try_acquire().unwrap();
        assert!(matches!(
            ours.release(foreign),
            Err(PoolError::ProtocolViolation { .. })
        ));
        assert_eq!(ours.stats().idle, 0);
        assert_eq!(theirs.stats().held, 1);
    }

    #[test]
    fn test_acquire_times_out_when_exhausted() {
        let pool = ResourcePool::new(config(1)).unwrap();
        let _held = pool.try_acquire().unwrap();

        let result = pool.acquire_within(Some(Duration::from_millis(30)));
        match result {
            Err(PoolError::PoolExhausted(waited)) => {
                assert!(waited >= Duration::from_millis(30))
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }

        let stats = pool.stats();
        assert_eq!(stats.held, 1);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        let pool = ResourcePool::new(config(1)).unwrap();
        let held = pool.try_acquire().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire_within(Some(Duration::from_secs(5))))
        };

        thread::sleep(Duration::from_millis(20));
        pool.release(held).unwrap();

        let resource = waiter.join().unwrap().unwrap();
        assert_eq!(resource.id(), ResourceId::new(1));
        assert_eq!(pool.total_count(), 1);
    }

    #[test]
    fn test_polling_strategy_picks_up_release() {
        let pool = ResourcePool::new(PoolConfig {
            strategy: AcquireStrategy::poll(Duration::from_millis(5)),
            acquire_timeout_ms: Some(5_000),
            ..config(1)
        })
        .unwrap();
        let held = pool.try_acquire().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire())
        };

        thread::sleep(Duration::from_millis(20));
        pool.release(held).unwrap();

        assert_eq!(waiter.join().unwrap().unwrap().id(), ResourceId::new(1));
    }

    #[test]
    fn test_polling_strategy_times_out() {
        let pool = ResourcePool::new(PoolConfig {
            strategy: AcquireStrategy::poll(Duration::from_millis(50)),
            acquire_timeout_ms: Some(20),
            ..config(1)
        })
        .unwrap();
        let _held = pool.try_acquire().unwrap();

        let started = Instant::now();
        assert!(matches!(pool.acquire(), Err(PoolError::PoolExhausted(_))));
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_setup_happens_outside_the_lock() {
        let pool = ResourcePool::new(PoolConfig {
            max_instances: 2,
            setup_delay_ms: 100,
            ..PoolConfig::default()
        })
        .unwrap();

        let first = pool.try_acquire().unwrap();
        let builder = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.try_acquire())
        };

        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        let stats = pool.stats();
        pool.release(first).unwrap();
        assert!(started.elapsed() < Duration::from_millis(80));

        assert_eq!(stats.created, 2);
        assert_eq!(stats.held, 2);
        assert!(stats.is_consistent());
        assert_eq!(builder.join().unwrap().unwrap().id(), ResourceId::new(2));
    }

    #[test]
    fn test_peak_held_tracks_high_water_mark() {
        let pool = ResourcePool::new(config(3)).unwrap();
        let a = pool.try_acquire().unwrap();
        let b = pool.try_acquire().unwrap();
        pool.release(a).unwrap();
        pool.release(b).unwrap();
        let _c = pool.try_acquire().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.peak_held, 2);
        assert_eq!(stats.created, 2);
        assert_eq!(stats.held, 1);
    }
}
