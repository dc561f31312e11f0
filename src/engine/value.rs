//! The versioned value bound to a key.

use crate::core::error::{ExStringError, ExStringResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Name the value type registers under with the host.
pub const TYPE_NAME: &str = "exstrtype";

/// Current on-disk encoding version of the persisted triple.
pub const ENCODING_VERSION: u32 = 0;

/// Largest version the engine will hand out.
///
/// Versions travel as signed 64-bit integers on the wire, so the unsigned
/// field never exceeds `i64::MAX`.
pub const MAX_VERSION: u64 = i64::MAX as u64;

/// A versioned, flag-tagged byte string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionedValue {
    /// Monotonic version; 0 only before the first write.
    pub version: u64,
    /// Opaque client flags.
    pub flags: u32,
    /// Stored bytes.
    pub value: Bytes,
}

impl VersionedValue {
    /// Create a value with explicit parts.
    pub fn new(version: u64, flags: u32, value: Bytes) -> Self {
        Self {
            version,
            flags,
            value,
        }
    }

    /// Length of the stored bytes.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Check if the stored bytes are empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Version reported to clients.
    pub fn version_i64(&self) -> i64 {
        i64::try_from(self.version).unwrap_or(i64::MAX)
    }

    /// Version the next relative mutation will carry.
    pub fn next_version(&self) -> ExStringResult<u64> {
        if self.version >= MAX_VERSION {
            return Err(ExStringError::Overflow);
        }
        Ok(self.version + 1)
    }

    /// Check a client supplied version. Zero skips the check.
    pub fn check_version(&self, expected: u64) -> ExStringResult<()> {
        if expected != 0 && expected != self.version {
            return Err(ExStringError::StaleVersion);
        }
        Ok(())
    }
}

/// Data-type descriptor registered with the host.
///
/// Carried by the command state rather than held in a process global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Registered type name.
    pub name: &'static str,
    /// Encoding version written with persisted values.
    pub encoding_version: u32,
}

impl TypeDescriptor {
    /// Descriptor for the versioned string type.
    pub const fn exstring() -> Self {
        Self {
            name: TYPE_NAME,
            encoding_version: ENCODING_VERSION,
        }
    }
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        Self::exstring()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_version() {
        let v = VersionedValue::default();
        assert_eq!(v.next_version().unwrap(), 1);

        let v = VersionedValue::new(41, 0, Bytes::from_static(b"x"));
        assert_eq!(v.next_version().unwrap(), 42);
    }

    #[test]
    fn test_next_version_at_ceiling() {
        let v = VersionedValue::new(MAX_VERSION, 0, Bytes::new());
        assert_eq!(v.next_version(), Err(ExStringError::Overflow));
    }

    #[test]
    fn test_check_version_zero_skips() {
        let v = VersionedValue::new(7, 0, Bytes::new());
        assert!(v.check_version(0).is_ok());
        assert!(v.check_version(7).is_ok());
        assert_eq!(v.check_version(6), Err(ExStringError::StaleVersion));
    }

    #[test]
    fn test_descriptor() {
        let d = TypeDescriptor::exstring();
        assert_eq!(d.name, "exstrtype");
        assert_eq!(d.encoding_version, 0);
    }
}
