//! Workers: single units of work that borrow a resource from the pool.
//!
//! A worker blocks until the pool hands it a resource, works with it for a
//! randomized number of rounds, and gives it back. The resource is always
//! returned, whether the work succeeds, fails, or panics.

use crate::pool::{Resource, ResourceHandle, ResourcePool};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use respool_core::config::WorkerConfig;
use respool_core::error::{Result, WorkerError};
use respool_core::id::{ResourceId, WorkerId};
use respool_core::types::WorkerState;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of one worker run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkReport {
    /// Worker that did the work
    pub worker: WorkerId,

    /// Resource it worked with
    pub resource: ResourceId,

    /// Rounds of work performed
    pub rounds: u32,

    /// Time spent waiting for the resource, in milliseconds
    pub waited_ms: u64,

    /// Time spent working, in milliseconds
    pub worked_ms: u64,
}

/// A single-use unit of work sharing a [`ResourcePool`] with other workers.
pub struct Worker {
    id: WorkerId,
    pool: Arc<ResourcePool>,
    config: WorkerConfig,
    state: WorkerState,
    history: Vec<WorkerState>,
    rng: StdRng,
}

impl Worker {
    /// Create a worker waiting for a resource from `pool`.
    pub fn new(id: WorkerId, pool: Arc<ResourcePool>, config: WorkerConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            id,
            pool,
            config,
            state: WorkerState::WaitingForResource,
            history: vec![WorkerState::WaitingForResource],
            rng,
        })
    }

    /// Label of this worker.
    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Every state this worker has been in, oldest first.
    pub fn history(&self) -> &[WorkerState] {
        &self.history
    }

    /// Acquire a resource, simulate work with it, and release it.
    pub fn run(&mut self) -> Result<WorkReport> {
        let waiting_since = Instant::now();
        let resource = self.acquire()?;
        let waited = waiting_since.elapsed();

        let resource_id = resource.id();
        let working_since = Instant::now();
        let rounds = self.simulate_work(resource_id);
        let worked = working_since.elapsed();

        self.finish(resource)?;

        Ok(WorkReport {
            worker: self.id.clone(),
            resource: resource_id,
            rounds,
            waited_ms: millis(waited),
            worked_ms: millis(worked),
        })
    }

    /// Acquire a resource, run `task` with it, and release it.
    ///
    /// The resource goes back to the pool even when `task` fails; the
    /// task's error is returned after the release.
    pub fn run_task<T, F>(&mut self, task: F) -> Result<T>
    where
        F: FnOnce(&Resource) -> Result<T>,
    {
        let resource = self.acquire()?;
        let outcome = task(resource.get());
        if let Err(e) = &outcome {
            warn!("Work {} failed on resource {}: {}", self.id, resource.id(), e);
        }

        self.finish(resource)?;
        outcome
    }

    fn acquire(&mut self) -> Result<ResourceHandle> {
        if !self.state.can_transition_to(WorkerState::Running) {
            return Err(WorkerError::InvalidTransition {
                from: self.state,
                to: WorkerState::Running,
            }
            .into());
        }

        debug!("Work {} waiting for a resource", self.id);
        let resource = self.pool.acquire_handle()?;
        self.transition(WorkerState::Running)?;
        info!("Work {} started on resource {}", self.id, resource.id());
        Ok(resource)
    }

    fn finish(&mut self, resource: ResourceHandle) -> Result<()> {
        self.transition(WorkerState::Releasing)?;
        info!(
            "Work {} finished on resource {}, leaving it",
            self.id,
            resource.id()
        );

        let released = resource.release();
        self.transition(WorkerState::Done)?;
        Ok(released?)
    }

    /// Play rounds until the stop condition fires or the round cap is hit.
    fn simulate_work(&mut self, resource: ResourceId) -> u32 {
        let round = self.config.work_round();
        let mut rounds = 0;

        loop {
            info!("Resource {} : work {} in progress...", resource, self.id);
            thread::sleep(round);
            rounds += 1;

            if rounds >= self.config.max_rounds {
                break;
            }
            if rounds >= self.config.min_rounds && self.rng.gen_bool(self.config.stop_probability)
            {
                break;
            }
        }

        rounds
    }

    fn transition(&mut self, to: WorkerState) -> std::result::Result<(), WorkerError> {
        if !self.state.can_transition_to(to) {
            return Err(WorkerError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        trace!("Work {}: {} -> {}", self.id, self.state, to);
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
