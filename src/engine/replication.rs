//! Canonical replication records.
//!
//! Mutations are never replicated the way the client phrased them. A record
//! carries the resolved absolute version and, where an expiration was set,
//! the absolute `PXAT` deadline, so replaying it on a replica gives the same
//! state regardless of when it is applied.

use crate::core::time::UnixMillis;
use bytes::Bytes;

/// A command to replay on replicas and append to the AOF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRecord {
    name: &'static str,
    args: Vec<Bytes>,
}

fn int_arg(n: impl ToString) -> Bytes {
    Bytes::from(n.to_string())
}

impl ReplicationRecord {
    fn new(name: &'static str, key: &[u8]) -> Self {
        Self {
            name,
            args: vec![Bytes::copy_from_slice(key)],
        }
    }

    fn push(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn push_bytes(self, bytes: &[u8]) -> Self {
        self.push(Bytes::copy_from_slice(bytes))
    }

    /// `EXSET key value ABS version [PXAT deadline | KEEPTTL] [FLAGS flags]`
    ///
    /// Without an expiration option the replica clears the TTL, which is
    /// what the primary did.
    pub fn exset(
        key: &[u8],
        value: &[u8],
        version: u64,
        deadline: Option<UnixMillis>,
        keep_ttl: bool,
        flags: Option<u32>,
    ) -> Self {
        let mut record = Self::new("EXSET", key)
            .push_bytes(value)
            .push(Bytes::from_static(b"ABS"))
            .push(int_arg(version));
        if let Some(deadline) = deadline {
            record = record
                .push(Bytes::from_static(b"PXAT"))
                .push(int_arg(deadline.as_millis()));
        } else if keep_ttl {
            record = record.push(Bytes::from_static(b"KEEPTTL"));
        }
        if let Some(flags) = flags {
            record = record
                .push(Bytes::from_static(b"FLAGS"))
                .push(int_arg(flags));
        }
        record
    }

    /// `EXSETVER key version`
    pub fn exsetver(key: &[u8], version: u64) -> Self {
        Self::new("EXSETVER", key).push(int_arg(version))
    }

    /// `EXAPPEND key bytes ABS version`
    pub fn exappend(key: &[u8], bytes: &[u8], version: u64) -> Self {
        Self::new("EXAPPEND", key)
            .push_bytes(bytes)
            .push(Bytes::from_static(b"ABS"))
            .push(int_arg(version))
    }

    /// `EXPREPEND key bytes ABS version`
    pub fn exprepend(key: &[u8], bytes: &[u8], version: u64) -> Self {
        Self::new("EXPREPEND", key)
            .push_bytes(bytes)
            .push(Bytes::from_static(b"ABS"))
            .push(int_arg(version))
    }

    /// `EXGAE key PXAT deadline`
    pub fn exgae(key: &[u8], deadline: UnixMillis) -> Self {
        Self::new("EXGAE", key)
            .push(Bytes::from_static(b"PXAT"))
            .push(int_arg(deadline.as_millis()))
    }

    /// `DEL key`
    pub fn del(key: &[u8]) -> Self {
        Self::new("DEL", key)
    }

    /// `EXSET key value ABS version FLAGS flags`, the form a rewritten AOF
    /// uses to rebuild a value.
    pub fn rewrite(key: &[u8], value: &[u8], version: u64, flags: u32) -> Self {
        Self::exset(key, value, version, None, false, Some(flags))
    }

    /// Command name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Arguments after the command name, key first.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// The key the record touches.
    pub fn key(&self) -> &[u8] {
        &self.args[0]
    }

    /// Name and arguments as one argv vector.
    pub fn to_argv(&self) -> Vec<Bytes> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(Bytes::from_static(self.name.as_bytes()));
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl std::fmt::Display for ReplicationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)?;
        for arg in &self.args {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
