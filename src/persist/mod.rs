//! Persistence hooks for the versioned value type.
//!
//! A value is persisted as the triple (version, flags, bytes) tagged with
//! the type's encoding version. The host frames and stores the encoded
//! triple; this module only defines what goes in it.

pub mod digest;
pub mod snapshot;

use crate::core::error::{ExStringError, ExStringResult};
use crate::engine::replication::ReplicationRecord;
use crate::engine::value::{TypeDescriptor, VersionedValue};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use digest::{digest, DigestSink, XxDigest};
pub use snapshot::{KeyspaceSnapshot, SnapshotEntry};

/// Fixed per-value overhead reported to the host: version (8), flags (4),
/// and the buffer handle (8).
pub const VALUE_HEADER_BYTES: usize = 20;

/// The three persisted logical fields, in save order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTriple {
    pub version: u64,
    pub flags: u32,
    pub value: Bytes,
}

/// Split a value into its persisted fields.
pub fn to_triple(value: &VersionedValue) -> PersistedTriple {
    PersistedTriple {
        version: value.version,
        flags: value.flags,
        value: value.value.clone(),
    }
}

/// Rebuild a value from persisted fields written under `encoding_version`.
///
/// Only the encoding version `descriptor` was registered with is accepted.
pub fn from_triple(
    triple: PersistedTriple,
    encoding_version: u32,
    descriptor: TypeDescriptor,
) -> ExStringResult<VersionedValue> {
    if encoding_version != descriptor.encoding_version {
        tracing::warn!(encoding_version, "refusing value with unknown encoding version");
        return Err(ExStringError::UnsupportedEncoding {
            version: encoding_version,
        });
    }
    Ok(VersionedValue::new(triple.version, triple.flags, triple.value))
}

/// Encode a value's triple with bincode.
pub fn encode(value: &VersionedValue) -> ExStringResult<Vec<u8>> {
    bincode::serialize(&to_triple(value)).map_err(|e| ExStringError::codec(e.to_string()))
}

/// Decode a bincode triple written under `encoding_version`.
pub fn decode(
    bytes: &[u8],
    encoding_version: u32,
    descriptor: TypeDescriptor,
) -> ExStringResult<VersionedValue> {
    let triple: PersistedTriple = bincode::deserialize(bytes).map_err(|e| {
        tracing::warn!(error = %e, len = bytes.len(), "failed to decode persisted value");
        ExStringError::codec(e.to_string())
    })?;
    from_triple(triple, encoding_version, descriptor)
}

/// The single command that rebuilds `value` under `key` during an AOF
/// rewrite.
pub fn aof_rewrite(key: &[u8], value: &VersionedValue) -> ReplicationRecord {
    ReplicationRecord::rewrite(key, &value.value, value.version, value.flags)
}

/// Memory attributed to a value.
pub fn mem_usage(value: &VersionedValue) -> usize {
    VALUE_HEADER_BYTES + value.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::ENCODING_VERSION;

    fn sample() -> VersionedValue {
        VersionedValue::new(12, 0xdead_beef, Bytes::from_static(b"\x00binary\xffpayload"))
    }

    #[test]
    fn test_triple_roundtrip() {
        let value = sample();
        let restored =
            from_triple(to_triple(&value), ENCODING_VERSION, TypeDescriptor::exstring()).unwrap();
        assert_eq!(restored, value);
    }

    #[test]
    fn test_encode_decode() {
        let value = sample();
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes, 0, TypeDescriptor::exstring()).unwrap(), value);
    }

    #[test]
    fn test_unknown_encoding_version() {
        let err = from_triple(to_triple(&sample()), 1, TypeDescriptor::exstring()).unwrap_err();
        assert_eq!(err, ExStringError::UnsupportedEncoding { version: 1 });
    }

    #[test]
    fn test_truncated_input() {
        let bytes = encode(&sample()).unwrap();
        let err = decode(&bytes[..bytes.len() - 3], 0, TypeDescriptor::exstring()).unwrap_err();
        assert!(err.is_persistence());
    }

    #[test]
    fn test_aof_rewrite() {
        let record = aof_rewrite(b"k", &VersionedValue::new(4, 2, Bytes::from_static(b"v")));
        assert_eq!(record.to_string(), "EXSET k v ABS 4 FLAGS 2");
    }

    #[test]
    fn test_mem_usage() {
        assert_eq!(mem_usage(&VersionedValue::default()), VALUE_HEADER_BYTES);
        assert_eq!(mem_usage(&sample()), VALUE_HEADER_BYTES + sample().len());
    }
}
