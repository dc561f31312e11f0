//! Append-only file.
//!
//! Each replication record is appended as one RESP array, the same framing a
//! replica link carries. Replaying the file through a [`CommandRouter`]
//! rebuilds the keyspace.
//!
//! [`CommandRouter`]: super::CommandRouter

use super::protocol::{ParseResult, Resp2Encoder, Resp2Parser};
use super::RedisCommand;
use crate::engine::replication::ReplicationRecord;
use crate::host::ReplicationSink;
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Replication sink appending records to a file.
pub struct AofWriter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    failed: AtomicU64,
}

impl AofWriter {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open AOF: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
            failed: AtomicU64::new(0),
        })
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records that could not be written. The keyspace already holds their
    /// effect, so a nonzero count means the file no longer rebuilds it.
    pub fn failed_appends(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Append one record and flush.
    pub fn append(&self, record: &ReplicationRecord) -> Result<()> {
        let bytes = Resp2Encoder::encode(&RedisCommand::from(record).to_array());
        let mut writer = self.writer.lock();
        writer
            .write_all(&bytes)
            .context("failed to append to AOF")?;
        writer.flush().context("failed to flush AOF")?;
        Ok(())
    }
}

impl ReplicationSink for AofWriter {
    fn replicate(&self, record: ReplicationRecord) {
        if let Err(e) = self.append(&record) {
            self.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                path = %self.path.display(),
                command = record.name(),
                error = %e,
                "AOF append failed"
            );
        }
    }
}

/// Decode every command in an AOF buffer.
///
/// A truncated trailing command is dropped with a warning, as a crash mid
/// write would leave one.
pub fn parse_commands(data: &[u8]) -> Result<Vec<RedisCommand>> {
    let mut parser = Resp2Parser::new();
    let mut commands = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        match parser.parse(&data[offset..]) {
            ParseResult::Ok(value, consumed) => {
                let Some(items) = value.as_array() else {
                    bail!("AOF entry at offset {} is not an array", offset);
                };
                let command = RedisCommand::from_array(items.to_vec())
                    .map_err(|e| anyhow::anyhow!("AOF entry at offset {}: {}", offset, e))?;
                commands.push(command);
                offset += consumed;
            }
            ParseResult::Incomplete => {
                warn!(
                    offset,
                    trailing = data.len() - offset,
                    "ignoring truncated AOF tail"
                );
                break;
            }
            ParseResult::Error(e) => bail!("corrupt AOF at offset {}: {}", offset, e),
        }
    }

    Ok(commands)
}

/// Read and decode an AOF.
pub fn read_commands(path: &Path) -> Result<Vec<RedisCommand>> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read AOF: {}", path.display()))?;
    parse_commands(&data)
}
