//! Configuration parsing and validation.
//!
//! Configuration is loaded from a TOML file with CLI overrides applied on
//! top. Every section has defaults, so an empty file is a valid config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest value the engine will build by appending or prepending (512MB).
pub const DEFAULT_MAX_VALUE_BYTES: usize = 512 * 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine limits.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Memory admission policy.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Replication record emission.
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Filesystem paths.
    #[serde(default)]
    pub paths: PathConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum size of a value produced by EXAPPEND/EXPREPEND.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_value_bytes: default_max_value_bytes(),
        }
    }
}

/// Memory admission policy for write commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Refuse deny-oom commands once used memory exceeds this (0 = unlimited).
    #[serde(default)]
    pub max_memory_bytes: usize,
}

/// Replication record emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Emit canonical replication records for mutating commands.
    #[serde(default = "default_replication_enabled")]
    pub enabled: bool,

    /// Append-only file receiving the records (RESP encoded).
    #[serde(default)]
    pub aof_path: Option<String>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            enabled: default_replication_enabled(),
            aof_path: None,
        }
    }
}

/// Filesystem path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Keyspace snapshot loaded at start and saved on exit.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_max_value_bytes() -> usize {
    DEFAULT_MAX_VALUE_BYTES
}

fn default_replication_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(ref snapshot_path) = overrides.snapshot_path {
            self.paths.snapshot_path = Some(snapshot_path.clone());
        }
        if let Some(ref aof_path) = overrides.aof_path {
            self.replication.aof_path = Some(aof_path.clone());
        }
        if let Some(max_memory_bytes) = overrides.max_memory_bytes {
            self.memory.max_memory_bytes = max_memory_bytes;
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_engine()?;
        self.validate_replication()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_engine(&self) -> Result<()> {
        if self.engine.max_value_bytes == 0 {
            anyhow::bail!("engine.max_value_bytes must be > 0");
        }
        Ok(())
    }

    fn validate_replication(&self) -> Result<()> {
        if self.replication.aof_path.is_some() && !self.replication.enabled {
            anyhow::bail!("replication.aof_path requires replication.enabled = true");
        }
        if let Some(ref path) = self.replication.aof_path {
            if path.trim().is_empty() {
                anyhow::bail!("replication.aof_path must not be empty");
            }
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override snapshot path.
    pub snapshot_path: Option<String>,
    /// Override AOF path.
    pub aof_path: Option<String>,
    /// Override memory limit.
    pub max_memory_bytes: Option<usize>,
}
