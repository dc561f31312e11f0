//! Command-line interface.
//!
//! Runs command scripts against the in-memory host and inspects the files
//! it leaves behind.

pub mod commands;

use crate::core::config::Config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;

/// Config file used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "config/exstring.toml";

/// exstring - versioned string values with optimistic concurrency.
#[derive(Parser, Debug)]
#[command(name = "exstring")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute commands against an in-memory keyspace.
    Run(commands::RunArgs),
    /// Configuration operations.
    Config(commands::ConfigArgs),
    /// Inspect snapshots and AOF files.
    Inspect(commands::InspectArgs),
}

/// Load the configuration named on the command line, falling back to
/// [`DEFAULT_CONFIG_PATH`] and then to built-in defaults.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(Path::new(path))
            .with_context(|| format!("failed to load config from {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::from_file(Path::new(DEFAULT_CONFIG_PATH))
        }
        None => Ok(Config::default()),
    }
}
