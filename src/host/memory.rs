//! In-memory reference host.
//!
//! Holds versioned values and plain strings (the latter so type errors can
//! be exercised) with per-key absolute expiration. Expiry is lazy: an expired
//! key is invisible to reads and is evicted the next time a writer opens it.

use super::{AccessMode, KeyLookup, Keyspace};
use crate::core::time::{Clock, UnixMillis};
use crate::engine::expire::Expiration;
use crate::engine::value::VersionedValue;
use crate::persist::mem_usage;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Payload of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Versioned(VersionedValue),
    /// A host-native string; versioned commands reject it with a type error.
    Plain(Bytes),
}

#[derive(Debug, Clone)]
struct Slot {
    value: SlotValue,
    expire_at: Option<UnixMillis>,
}

impl Slot {
    fn is_expired(&self, now: UnixMillis) -> bool {
        self.expire_at.is_some_and(|deadline| now.is_at_or_after(deadline))
    }

    fn size(&self, key: &[u8]) -> usize {
        let payload = match &self.value {
            SlotValue::Versioned(v) => mem_usage(v),
            SlotValue::Plain(bytes) => bytes.len(),
        };
        key.len() + payload
    }
}

/// A live versioned entry, as exported for snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: Bytes,
    pub value: VersionedValue,
    pub expire_at: Option<UnixMillis>,
}

/// In-memory key namespace.
pub struct MemoryKeyspace {
    data: RwLock<HashMap<Bytes, Slot>>,
    clock: Arc<dyn Clock>,
}

impl MemoryKeyspace {
    /// Create an empty namespace evaluating expirations against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Bind a plain host string, replacing whatever the key held.
    pub fn set_plain(&self, key: &[u8], value: impl Into<Bytes>) {
        self.data.write().insert(
            Bytes::copy_from_slice(key),
            Slot {
                value: SlotValue::Plain(value.into()),
                expire_at: None,
            },
        );
    }

    /// Restore a versioned value with an absolute expiration.
    pub fn restore(&self, key: &[u8], value: VersionedValue, expire_at: Option<UnixMillis>) {
        self.data.write().insert(
            Bytes::copy_from_slice(key),
            Slot {
                value: SlotValue::Versioned(value),
                expire_at,
            },
        );
    }

    /// Live versioned entries, sorted by key.
    pub fn entries(&self) -> Vec<KeyEntry> {
        let now = self.clock.now();
        let mut entries: Vec<KeyEntry> = self
            .data
            .read()
            .iter()
            .filter(|(_, slot)| !slot.is_expired(now))
            .filter_map(|(key, slot)| match &slot.value {
                SlotValue::Versioned(value) => Some(KeyEntry {
                    key: key.clone(),
                    value: value.clone(),
                    expire_at: slot.expire_at,
                }),
                SlotValue::Plain(_) => None,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.data
            .read()
            .values()
            .filter(|slot| !slot.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired key.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, slot| !slot.is_expired(now));
        before - data.len()
    }
}

impl Keyspace for MemoryKeyspace {
    fn lookup(&self, key: &[u8], mode: AccessMode) -> KeyLookup {
        let now = self.clock.now();

        if mode == AccessMode::Write {
            let mut data = self.data.write();
            if data.get(key).is_some_and(|slot| slot.is_expired(now)) {
                data.remove(key);
            }
        }

        match self.data.read().get(key) {
            Some(slot) if slot.is_expired(now) => KeyLookup::Absent,
            Some(Slot {
                value: SlotValue::Versioned(value),
                ..
            }) => KeyLookup::Bound(value.clone()),
            Some(Slot {
                value: SlotValue::Plain(_),
                ..
            }) => KeyLookup::WrongType,
            None => KeyLookup::Absent,
        }
    }

    fn store(&self, key: &[u8], value: VersionedValue) {
        let mut data = self.data.write();
        match data.get_mut(key) {
            Some(slot) => slot.value = SlotValue::Versioned(value),
            None => {
                data.insert(
                    Bytes::copy_from_slice(key),
                    Slot {
                        value: SlotValue::Versioned(value),
                        expire_at: None,
                    },
                );
            }
        }
    }

    fn delete(&self, key: &[u8]) -> bool {
        self.data.write().remove(key).is_some()
    }

    fn set_expire(&self, key: &[u8], expiration: Expiration) {
        let now = self.clock.now();
        if let Some(slot) = self.data.write().get_mut(key) {
            slot.expire_at = match expiration {
                Expiration::Persist => None,
                Expiration::In { ms } => Some(now.add_ms(ms)),
            };
        }
    }

    fn expire_at(&self, key: &[u8]) -> Option<UnixMillis> {
        self.data.read().get(key).and_then(|slot| slot.expire_at)
    }

    fn used_memory(&self) -> usize {
        self.data
            .read()
            .iter()
            .map(|(key, slot)| slot.size(key))
            .sum()
    }
}
