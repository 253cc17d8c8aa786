//! Integration tests for the pool under concurrent load.
//!
//! These drive many threads against a small pool and sample its
//! bookkeeping while they run, checking the cap, the accounting between
//! idle and checked-out resources, and identifier allocation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use respool_concurrency::{ResourcePool, Scenario, Worker};
use respool_core::config::{AcquireStrategy, PoolConfig, ScenarioConfig, WorkerConfig};
use respool_core::id::{ResourceId, WorkerId};

fn pool_config(max_instances: usize, strategy: AcquireStrategy) -> PoolConfig {
    PoolConfig {
        max_instances,
        setup_delay_ms: 2,
        strategy,
        acquire_timeout_ms: None,
    }
}

/// Hammer a pool from `threads` threads while a sampler checks its
/// invariants, returning every identifier any thread saw.
fn hammer(pool: &Arc<ResourcePool>, threads: usize, rounds: usize) -> HashSet<ResourceId> {
    let stop = Arc::new(AtomicBool::new(false));

    let sampler = {
        let pool = Arc::clone(pool);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut samples = 0;
            while !stop.load(Ordering::Relaxed) {
                let stats = pool.stats();
                assert!(stats.is_consistent(), "inconsistent pool: {:?}", stats);
                assert!(stats.held <= stats.max_instances);
                samples += 1;
                thread::yield_now();
            }
            samples
        })
    };

    let users: Vec<_> = (0..threads)
        .map(|_| {
            let pool = Arc::clone(pool);
            thread::spawn(move || {
                let mut seen = HashSet::new();
                for _ in 0..rounds {
                    let resource = pool.acquire().unwrap();
                    seen.insert(resource.id());
                    thread::sleep(Duration::from_millis(1));
                    pool.release(resource).unwrap();
                }
                seen
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for user in users {
        seen.extend(user.join().unwrap());
    }

    stop.store(true, Ordering::Relaxed);
    let samples = sampler.join().unwrap();
    assert!(samples > 0);

    seen
}

#[test]
fn test_cap_holds_under_contention_with_notify() {
    let pool = ResourcePool::new(pool_config(3, AcquireStrategy::Notify)).unwrap();

    let seen = hammer(&pool, 8, 20);

    let stats = pool.stats();
    assert!(stats.created <= 3);
    assert_eq!(stats.idle, stats.created);
    assert_eq!(stats.held, 0);
    assert!(stats.peak_held <= 3);
    assert_eq!(
        seen,
        (1..=stats.created as u64)
            .map(ResourceId::new)
            .collect::<HashSet<_>>()
    );
}

#[test]
fn test_cap_holds_under_contention_with_polling() {
    let pool = ResourcePool::new(pool_config(
        2,
        AcquireStrategy::poll(Duration::from_millis(1)),
    ))
    .unwrap();

    let seen = hammer(&pool, 6, 10);

    let stats = pool.stats();
    assert!(stats.created <= 2);
    assert!(stats.is_consistent());
    assert!(seen.iter().all(|id| id.get() >= 1 && id.get() <= 2));
}

#[test]
fn test_try_acquire_never_blocks_at_cap() {
    let pool = ResourcePool::new(pool_config(2, AcquireStrategy::Notify)).unwrap();
    let _a = pool.try_acquire().unwrap();
    let _b = pool.try_acquire().unwrap();

    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.try_acquire().is_none())
        })
        .collect();

    for attempt in attempts {
        assert!(attempt.join().unwrap());
    }
    assert_eq!(pool.total_count(), 2);
}

#[test]
fn test_concurrent_creation_assigns_distinct_ids() {
    let pool = ResourcePool::new(PoolConfig {
        setup_delay_ms: 20,
        ..pool_config(5, AcquireStrategy::Notify)
    })
    .unwrap();

    let builders: Vec<_> = (0..5)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.try_acquire().map(|resource| resource.id()))
        })
        .collect();

    let mut ids: Vec<_> = builders
        .into_iter()
        .map(|builder| builder.join().unwrap().unwrap())
        .collect();
    ids.sort();

    assert_eq!(ids, (1..=5).map(ResourceId::new).collect::<Vec<_>>());
}

#[test]
fn test_single_worker_reuses_its_resource() {
    let pool = ResourcePool::new(pool_config(1, AcquireStrategy::Notify)).unwrap();
    let work = WorkerConfig {
        work_round_ms: 1,
        max_rounds: 2,
        seed: Some(1),
        ..WorkerConfig::default()
    };

    let first = Worker::new(WorkerId::new("M1"), Arc::clone(&pool), work.clone())
        .unwrap()
        .run()
        .unwrap();
    let second = Worker::new(WorkerId::new("M2"), Arc::clone(&pool), work)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(first.resource, ResourceId::new(1));
    assert_eq!(second.resource, ResourceId::new(1));
    assert_eq!(pool.total_count(), 1);
}

#[test]
fn test_staggered_scenario_completes_with_three_resources() {
    let config = ScenarioConfig {
        workers: 5,
        stagger_ms: 3,
        pool: pool_config(3, AcquireStrategy::Notify),
        worker: WorkerConfig {
            work_round_ms: 3,
            min_rounds: 1,
            max_rounds: 6,
            stop_probability: 0.2,
            seed: Some(2024),
        },
    };

    let scenario = Scenario::new(config).unwrap();
    let report = scenario.run().unwrap();

    assert_eq!(report.workers.len(), 5);
    assert_eq!(report.max_instances, 3);
    assert!(report.resources_created <= 3);
    assert_eq!(
        report.highest_resource_id().map(ResourceId::get),
        Some(report.resources_created as u64)
    );
    assert!(scenario.pool().stats().is_consistent());
}
