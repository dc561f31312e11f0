//! CLI command implementations.

mod config;
mod inspect;
mod run;

pub use config::{run_config, ConfigArgs};
pub use inspect::{run_inspect, InspectArgs};
pub use run::{run_script, RunArgs};
