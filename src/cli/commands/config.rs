//! Config command implementation.

use crate::core::config::Config;
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Configuration operations.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a configuration file.
    Validate {
        /// Config file path.
        path: PathBuf,
    },
    /// Print the effective configuration, defaults included.
    Show {
        /// Output format (toml, json).
        #[arg(long, default_value = "toml")]
        format: String,
    },
}

/// Run the config command against the already loaded configuration.
pub fn run_config(args: ConfigArgs, effective: &Config) -> Result<()> {
    match args.command {
        ConfigCommand::Validate { path } => {
            let config = Config::from_file(&path)?;
            println!("✓ {} is valid", path.display());
            if config.replication.aof_path.is_none() {
                println!("  ⚠ replication.aof_path not set, records are discarded");
            }
            if config.paths.snapshot_path.is_none() {
                println!("  ⚠ paths.snapshot_path not set, the keyspace is not persisted");
            }
            Ok(())
        }
        ConfigCommand::Show { format } => {
            let rendered = render(effective, &format)?;
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn render(config: &Config, format: &str) -> Result<String> {
    match format {
        "toml" => Ok(toml::to_string_pretty(config)?),
        "json" => Ok(serde_json::to_string_pretty(config)?),
        other => bail!("unknown format: {} (expected toml or json)", other),
    }
}
