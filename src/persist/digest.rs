//! Consistency digests.
//!
//! The host compares keyspace digests between primary and replicas. Each
//! value folds its fields into the digest in a fixed order and then closes
//! the sequence. Every element is length prefixed, so adjacent fields cannot
//! run into each other.

use crate::engine::value::VersionedValue;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Seed used for every digest sequence.
pub const DIGEST_SEED: u64 = 0x6578_7374_7279_7065;

/// Accumulator the host hands to a value's digest hook.
pub trait DigestSink {
    /// Add an integer, folded as its decimal text.
    fn add_long_long(&mut self, value: i64);

    /// Add raw bytes.
    fn add_string_buffer(&mut self, bytes: &[u8]);

    /// Close the current sequence so the next value starts fresh.
    fn end_sequence(&mut self);
}

/// Fold a value into `sink`: version, flags, bytes, end of sequence.
pub fn digest(value: &VersionedValue, sink: &mut dyn DigestSink) {
    sink.add_long_long(value.version_i64());
    sink.add_long_long(i64::from(value.flags));
    sink.add_string_buffer(&value.value);
    sink.end_sequence();
}

/// xxHash64 backed digest.
///
/// Sequences are XOR-ed together, so the final digest does not depend on
/// the order keys are visited in.
pub struct XxDigest {
    sequence: XxHash64,
    total: u64,
}

impl XxDigest {
    pub fn new() -> Self {
        Self {
            sequence: XxHash64::with_seed(DIGEST_SEED),
            total: 0,
        }
    }

    /// Digest of all closed sequences.
    pub fn finish(&self) -> u64 {
        self.total
    }
}

impl Default for XxDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl XxDigest {
    fn add_element(&mut self, bytes: &[u8]) {
        self.sequence.write(&(bytes.len() as u64).to_le_bytes());
        self.sequence.write(bytes);
    }
}

impl DigestSink for XxDigest {
    fn add_long_long(&mut self, value: i64) {
        self.add_element(value.to_string().as_bytes());
    }

    fn add_string_buffer(&mut self, bytes: &[u8]) {
        self.add_element(bytes);
    }

    fn end_sequence(&mut self) {
        self.total ^= self.sequence.finish();
        self.sequence = XxHash64::with_seed(DIGEST_SEED);
    }
}
