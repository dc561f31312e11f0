//! exstring - unified CLI entrypoint.
//!
//! Usage:
//!   exstring run script.txt --snapshot data/exstring.snap
//!   exstring run --aof data/exstring.aof < commands.txt
//!   exstring config validate config/exstring.toml
//!   exstring config show --format json
//!   exstring inspect snapshot data/exstring.snap
//!   exstring inspect aof data/exstring.aof

use anyhow::Result;
use clap::Parser;
use exstring::cli::commands::{run_config, run_inspect, run_script};
use exstring::cli::{load_config, Cli, Commands};
use exstring::config::ConfigOverrides;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    config.apply_overrides(&ConfigOverrides {
        log_level: cli.log_level,
        ..Default::default()
    });

    match cli.command {
        Commands::Run(args) => run_script(args, config),
        Commands::Config(args) => run_config(args, &config),
        Commands::Inspect(args) => run_inspect(args),
    }
}
