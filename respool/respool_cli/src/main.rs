use clap::{Parser, Subcommand};
use respool_core::utils::LogLevel;

mod commands;

/// respool: a bounded resource pool shared by staggered workers
///
/// Runs the object pool demonstration: several workers compete for a small
/// pool of slow-to-build resources, reusing them as they are released.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log level for pool and worker narration (trace, debug, info, warn, error)
    #[clap(long, global = true, default_value = "info")]
    log_level: LogLevel,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the staggered-workers scenario
    Run(commands::run::RunArgs),

    /// Print the default configuration as TOML
    #[clap(name = "default-config")]
    DefaultConfig(commands::config::DefaultConfigArgs),
}

fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_env("RESPOOL_LOG")
        .format_timestamp_millis()
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Commands::Run(args) => commands::run::execute_run(&args),
        Commands::DefaultConfig(args) => commands::config::execute_default_config(&args),
    }
}
