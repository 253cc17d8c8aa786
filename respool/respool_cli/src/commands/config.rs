//! Configuration commands

use clap::Args;
use respool_core::config::ScenarioConfig;

/// Arguments for the default-config command
#[derive(Args)]
pub struct DefaultConfigArgs {}

/// Print the default scenario configuration, ready to be saved and edited.
pub fn execute_default_config(_args: &DefaultConfigArgs) -> anyhow::Result<()> {
    print!("{}", ScenarioConfig::default().to_toml_string()?);
    Ok(())
}
