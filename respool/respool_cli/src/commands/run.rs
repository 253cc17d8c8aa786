//! The run command
//!
//! Builds a scenario configuration from an optional TOML file plus flag
//! overrides, runs it, and prints the outcome.

use anyhow::Context;
use clap::Args;
use log::debug;
use respool_concurrency::{Scenario, ScenarioReport};
use respool_core::config::{AcquireStrategy, ScenarioConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML configuration file; flags below override its values
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of resources the pool may create
    #[clap(long)]
    pub max_instances: Option<usize>,

    /// Number of workers to start
    #[clap(long)]
    pub workers: Option<usize>,

    /// Delay between starting consecutive workers, in milliseconds
    #[clap(long)]
    pub stagger_ms: Option<u64>,

    /// Setup cost of each new resource, in milliseconds
    #[clap(long)]
    pub setup_delay_ms: Option<u64>,

    /// Length of one round of work, in milliseconds
    #[clap(long)]
    pub work_round_ms: Option<u64>,

    /// Rounds every worker plays before it may stop
    #[clap(long)]
    pub min_rounds: Option<u32>,

    /// Most rounds any worker plays
    #[clap(long)]
    pub max_rounds: Option<u32>,

    /// Chance of stopping after each round
    #[clap(long)]
    pub stop_probability: Option<f64>,

    /// Seed for reproducible work lengths
    #[clap(long)]
    pub seed: Option<u64>,

    /// Poll for released resources at this interval instead of waiting
    /// for a release signal
    #[clap(long)]
    pub poll_interval_ms: Option<u64>,

    /// Give up waiting for a resource after this many milliseconds
    #[clap(long)]
    pub acquire_timeout_ms: Option<u64>,

    /// Print the report as JSON
    #[clap(long)]
    pub json: bool,
}

impl RunArgs {
    /// Resolve the configuration file and flag overrides into one
    /// validated configuration.
    pub fn scenario_config(&self) -> anyhow::Result<ScenarioConfig> {
        let mut config = match &self.config {
            Some(path) => ScenarioConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => ScenarioConfig::default(),
        };

        if let Some(max_instances) = self.max_instances {
            config.pool.max_instances = max_instances;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(stagger_ms) = self.stagger_ms {
            config.stagger_ms = stagger_ms;
        }
        if let Some(setup_delay_ms) = self.setup_delay_ms {
            config.pool.setup_delay_ms = setup_delay_ms;
        }
        if let Some(interval_ms) = self.poll_interval_ms {
            config.pool.strategy = AcquireStrategy::poll(Duration::from_millis(interval_ms));
        }
        if let Some(timeout_ms) = self.acquire_timeout_ms {
            config.pool.acquire_timeout_ms = Some(timeout_ms);
        }
        if let Some(work_round_ms) = self.work_round_ms {
            config.worker.work_round_ms = work_round_ms;
        }
        if let Some(min_rounds) = self.min_rounds {
            config.worker.min_rounds = min_rounds;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.worker.max_rounds = max_rounds;
        }
        if let Some(stop_probability) = self.stop_probability {
            config.worker.stop_probability = stop_probability;
        }
        if let Some(seed) = self.seed {
            config.worker.seed = Some(seed);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Implementation of the run command
pub fn execute_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.scenario_config()?;
    debug!("Resolved configuration: {:?}", config);
    let report = Scenario::new(config)?.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &ScenarioReport) {
    println!("workers completed: {}", report.workers.len());
    println!(
        "resources created: {} (cap {})",
        report.resources_created, report.max_instances
    );
    println!("peak in use: {}", report.peak_held);

    for work in &report.workers {
        println!(
            "  {:<4} resource {:<3} rounds {:<3} waited {} ms, worked {} ms",
            work.worker, work.resource, work.rounds, work.waited_ms, work.worked_ms
        );
    }
}
