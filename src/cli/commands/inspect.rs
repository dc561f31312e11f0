//! Inspect command implementation.

use crate::adapters::redis::aof::read_commands;
use crate::engine::TypeDescriptor;
use crate::persist::{KeyspaceSnapshot, SnapshotEntry};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat};
use clap::{Args, Subcommand};
use serde_json::json;
use std::path::PathBuf;

/// Inspect snapshots and AOF files.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(subcommand)]
    pub command: InspectCommand,
}

/// Inspect subcommands.
#[derive(Subcommand, Debug)]
pub enum InspectCommand {
    /// List the keys of a snapshot.
    Snapshot {
        /// Snapshot path.
        path: PathBuf,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// List the commands of an AOF.
    Aof {
        /// AOF path.
        path: PathBuf,
    },
}

/// Run the inspect command.
pub fn run_inspect(args: InspectArgs) -> Result<()> {
    match args.command {
        InspectCommand::Snapshot { path, json } => {
            let snapshot = KeyspaceSnapshot::read_from_file(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot_json(&snapshot)?)?);
            } else {
                print_snapshot(&snapshot)?;
            }
        }
        InspectCommand::Aof { path } => {
            for (i, cmd) in read_commands(&path)?.iter().enumerate() {
                let args: Vec<String> = cmd
                    .args
                    .iter()
                    .map(|a| format!("\"{}\"", a.escape_ascii()))
                    .collect();
                println!("{:>6}  {} {}", i + 1, cmd.name, args.join(" "));
            }
        }
    }
    Ok(())
}

fn format_deadline(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{}ms", ms))
}

fn print_snapshot(snapshot: &KeyspaceSnapshot) -> Result<()> {
    println!("encoding version: {}", snapshot.encoding_version);
    println!("taken at:         {}", format_deadline(snapshot.taken_at.as_millis()));
    println!("keys:             {}", snapshot.entries.len());
    println!("digest:           {:016x}", snapshot.digest(TypeDescriptor::exstring())?);
    println!();
    println!(
        "{:<24} {:>10} {:>10} {:>10}  EXPIRES",
        "KEY", "VERSION", "FLAGS", "BYTES"
    );
    for entry in &snapshot.entries {
        println!(
            "{:<24} {:>10} {:>10} {:>10}  {}",
            entry.key.escape_ascii().to_string(),
            entry.triple.version,
            entry.triple.flags,
            entry.triple.value.len(),
            expires(entry)
        );
    }
    Ok(())
}

fn expires(entry: &SnapshotEntry) -> String {
    entry
        .expire_at
        .map(|at| format_deadline(at.as_millis()))
        .unwrap_or_else(|| "-".to_string())
}

fn snapshot_json(snapshot: &KeyspaceSnapshot) -> Result<serde_json::Value> {
    let entries: Vec<serde_json::Value> = snapshot
        .entries
        .iter()
        .map(|entry| {
            json!({
                "key": String::from_utf8_lossy(&entry.key),
                "version": entry.triple.version,
                "flags": entry.triple.flags,
                "value": String::from_utf8_lossy(&entry.triple.value),
                "expire_at_ms": entry.expire_at.map(|at| at.as_millis()),
                "expires": entry.expire_at.map(|at| format_deadline(at.as_millis())),
            })
        })
        .collect();

    Ok(json!({
        "encoding_version": snapshot.encoding_version,
        "taken_at_ms": snapshot.taken_at.as_millis(),
        "digest": format!("{:016x}", snapshot.digest(TypeDescriptor::exstring())?),
        "entries": entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::{ManualClock, UnixMillis};
    use crate::engine::VersionedValue;
    use crate::host::{Keyspace, MemoryKeyspace};
    use bytes::Bytes;
    use std::sync::Arc;

    #[test]
    fn test_format_deadline() {
        assert_eq!(format_deadline(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_deadline(1_500), "1970-01-01T00:00:01.500Z");
    }

    #[test]
    fn test_snapshot_json() {
        let clock = Arc::new(ManualClock::new(0));
        let keyspace = MemoryKeyspace::new(clock);
        keyspace.store(b"k", VersionedValue::new(3, 1, Bytes::from_static(b"v")));
        keyspace.restore(
            b"t",
            VersionedValue::new(1, 0, Bytes::from_static(b"w")),
            Some(UnixMillis::new(2_000)),
        );

        let snapshot = KeyspaceSnapshot::capture(&keyspace, TypeDescriptor::exstring(), UnixMillis::new(0));
        let value = snapshot_json(&snapshot).unwrap();
        assert_eq!(value["entries"][0]["key"], "k");
        assert_eq!(value["entries"][0]["version"], 3);
        assert!(value["entries"][0]["expires"].is_null());
        assert_eq!(value["entries"][1]["expire_at_ms"], 2_000);
        assert_eq!(value["entries"][1]["expires"], "1970-01-01T00:00:02.000Z");
    }
}
