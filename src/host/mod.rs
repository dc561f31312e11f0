//! Host collaborators.
//!
//! The engine does not own the key namespace, the expiration timer, or the
//! replication log. It reaches them through the traits below. An in-memory
//! reference host lives in [`memory`].

pub mod memory;

use crate::core::time::UnixMillis;
use crate::engine::expire::Expiration;
use crate::engine::replication::ReplicationRecord;
use crate::engine::value::VersionedValue;
use parking_lot::Mutex;

pub use memory::MemoryKeyspace;

/// How a command intends to use the key it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// What a key currently resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLookup {
    /// No live binding.
    Absent,
    /// Bound to a value of another kind.
    WrongType,
    /// Bound to a versioned value.
    Bound(VersionedValue),
}

/// Key namespace of the host store.
pub trait Keyspace: Send + Sync {
    /// Resolve a key. Expired keys are reported as absent.
    fn lookup(&self, key: &[u8], mode: AccessMode) -> KeyLookup;

    /// Bind a versioned value, keeping any expiration the key already has.
    fn store(&self, key: &[u8], value: VersionedValue);

    /// Remove a key. Returns true if something was removed.
    fn delete(&self, key: &[u8]) -> bool;

    /// Change a key's expiration.
    fn set_expire(&self, key: &[u8], expiration: Expiration);

    /// Absolute expiration of a key, if it has one.
    fn expire_at(&self, key: &[u8]) -> Option<UnixMillis>;

    /// Bytes used by the namespace, for memory admission.
    fn used_memory(&self) -> usize;
}

/// Receiver of canonical replication records.
pub trait ReplicationSink: Send + Sync {
    fn replicate(&self, record: ReplicationRecord);
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReplicationSink for NullSink {
    fn replicate(&self, _record: ReplicationRecord) {}
}

/// Sink that keeps records in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<ReplicationRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted so far.
    pub fn records(&self) -> Vec<ReplicationRecord> {
        self.records.lock().clone()
    }

    /// Take and clear the recorded records.
    pub fn drain(&self) -> Vec<ReplicationRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ReplicationSink for RecordingSink {
    fn replicate(&self, record: ReplicationRecord) {
        self.records.lock().push(record);
    }
}
