//! Keyspace snapshots.
//!
//! A snapshot is a bincode file holding every live versioned key of a
//! [`MemoryKeyspace`] with its absolute expiration. Loading skips entries
//! whose deadline has already passed.

use super::digest::{digest, DigestSink, XxDigest};
use super::{from_triple, to_triple, PersistedTriple};
use crate::core::time::UnixMillis;
use crate::engine::value::TypeDescriptor;
use crate::host::MemoryKeyspace;
use anyhow::{Context, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// One persisted key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: Bytes,
    pub triple: PersistedTriple,
    pub expire_at: Option<UnixMillis>,
}

/// Serialized keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyspaceSnapshot {
    /// Encoding version of every triple in the file.
    pub encoding_version: u32,
    /// Clock reading when the snapshot was taken.
    pub taken_at: UnixMillis,
    /// Entries sorted by key.
    pub entries: Vec<SnapshotEntry>,
}

impl KeyspaceSnapshot {
    /// Capture the live versioned keys of `keyspace`, tagged with the
    /// encoding version of `descriptor`.
    pub fn capture(
        keyspace: &MemoryKeyspace,
        descriptor: TypeDescriptor,
        taken_at: UnixMillis,
    ) -> Self {
        let entries = keyspace
            .entries()
            .into_iter()
            .map(|entry| SnapshotEntry {
                key: entry.key,
                triple: to_triple(&entry.value),
                expire_at: entry.expire_at,
            })
            .collect();

        Self {
            encoding_version: descriptor.encoding_version,
            taken_at,
            entries,
        }
    }

    /// Load entries into `keyspace`, skipping those expired at `now`.
    ///
    /// Returns the number of keys restored.
    pub fn restore_into(
        &self,
        keyspace: &MemoryKeyspace,
        descriptor: TypeDescriptor,
        now: UnixMillis,
    ) -> Result<usize> {
        let mut restored = 0;
        for entry in &self.entries {
            if entry
                .expire_at
                .is_some_and(|deadline| now.is_at_or_after(deadline))
            {
                tracing::debug!(key_len = entry.key.len(), "skipping expired snapshot entry");
                continue;
            }
            let value = from_triple(entry.triple.clone(), self.encoding_version, descriptor)
                .context("failed to restore snapshot entry")?;
            keyspace.restore(&entry.key, value, entry.expire_at);
            restored += 1;
        }
        Ok(restored)
    }

    /// Order-independent digest over keys and values.
    pub fn digest(&self, descriptor: TypeDescriptor) -> Result<u64> {
        let mut sink = XxDigest::new();
        for entry in &self.entries {
            let value = from_triple(entry.triple.clone(), self.encoding_version, descriptor)?;
            sink.add_string_buffer(&entry.key);
            digest(&value, &mut sink);
        }
        Ok(sink.finish())
    }

    /// Serialize the snapshot to bytes.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).context("failed to serialize snapshot")
    }

    /// Deserialize a snapshot from bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).context("failed to deserialize snapshot")
    }

    /// Write the snapshot to a file.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create snapshot file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&self.serialize()?)
            .context("failed to write snapshot")?;
        writer.flush().context("failed to flush snapshot")?;
        Ok(())
    }

    /// Read a snapshot from a file.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open snapshot file: {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .context("failed to read snapshot")?;
        Self::deserialize(&bytes)
    }
}
