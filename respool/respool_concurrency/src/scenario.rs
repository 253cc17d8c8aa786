//! The demonstration scenario: several workers, started a little apart,
//! competing for a small shared pool.
//!
//! Each worker runs on its own named thread. The driver waits for all of
//! them and reports what each one did along with the pool's final
//! bookkeeping.

use crate::pool::ResourcePool;
use crate::worker::{WorkReport, Worker};
use log::{error, info};
use respool_core::config::ScenarioConfig;
use respool_core::error::{Error, Result, WorkerError};
use respool_core::id::{ResourceId, WorkerId};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type RunningWorker = (WorkerId, JoinHandle<Result<WorkReport>>);

/// Summary of a finished scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Configured instance cap
    pub max_instances: usize,

    /// Resources the pool actually created
    pub resources_created: usize,

    /// Most resources checked out at the same time
    pub peak_held: usize,

    /// One report per worker, in start order
    pub workers: Vec<WorkReport>,
}

impl ScenarioReport {
    /// Highest resource identifier any worker used.
    pub fn highest_resource_id(&self) -> Option<ResourceId> {
        self.workers.iter().map(|report| report.resource).max()
    }
}

/// Workers sharing one pool, ready to run.
pub struct Scenario {
    config: ScenarioConfig,
    pool: Arc<ResourcePool>,
}

impl Scenario {
    /// Validate `config` and create the shared pool.
    pub fn new(config: ScenarioConfig) -> Result<Self> {
        config.validate()?;
        let pool = ResourcePool::new(config.pool.clone())?;
        Ok(Self { config, pool })
    }

    /// The pool shared by all workers.
    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// Start every worker, wait for all of them, and summarize.
    ///
    /// Workers that fail do not stop the others. If a worker thread cannot
    /// be started, no further workers are started. Either way the first
    /// failure is returned only after every started worker has been joined.
    pub fn run(&self) -> Result<ScenarioReport> {
        info!(
            "Starting {} workers, {:?} apart, sharing at most {} resources",
            self.config.workers,
            self.config.stagger(),
            self.config.pool.max_instances
        );

        let mut running = Vec::with_capacity(self.config.workers);
        let mut first_failure: Option<Error> = None;
        for index in 0..self.config.workers {
            if index > 0 {
                thread::sleep(self.config.stagger());
            }
            match self.spawn_worker(index) {
                Ok(worker) => running.push(worker),
                Err(e) => {
                    error!("Could not start worker {}: {}", WorkerId::numbered(index), e);
                    first_failure = Some(e);
                    break;
                }
            }
        }

        let reports = join_workers(running, &mut first_failure);
        if let Some(e) = first_failure {
            return Err(e);
        }

        let stats = self.pool.stats();
        info!(
            "All {} workers done; {} resources created, at most {} in use at once",
            reports.len(),
            stats.created,
            stats.peak_held
        );

        Ok(ScenarioReport {
            max_instances: stats.max_instances,
            resources_created: stats.created,
            peak_held: stats.peak_held,
            workers: reports,
        })
    }

    fn spawn_worker(&self, index: usize) -> Result<RunningWorker> {
        let id = WorkerId::numbered(index);

        let mut config = self.config.worker.clone();
        config.seed = config.seed.map(|seed| seed.wrapping_add(index as u64));
        let mut worker = Worker::new(id.clone(), Arc::clone(&self.pool), config)?;

        let handle = thread::Builder::new()
            .name(format!("respool-{}", id))
            .spawn(move || worker.run())?;
        Ok((id, handle))
    }
}

/// Join every started worker, recording the first failure not already
/// recorded in `first_failure`.
fn join_workers(
    running: Vec<RunningWorker>,
    first_failure: &mut Option<Error>,
) -> Vec<WorkReport> {
    let mut reports = Vec::with_capacity(running.len());
    for (id, handle) in running {
        let outcome = handle
            .join()
            .unwrap_or_else(|_| Err(WorkerError::Panicked(id.to_string()).into()));

        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("Worker {} failed: {}", id, e);
                if first_failure.is_none() {
                    *first_failure = Some(e);
                }
            }
        }
    }
    reports
}
