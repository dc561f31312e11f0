//! Versioned value operations.
//!
//! Every operation follows the same shape: sample the clock once, resolve
//! the key, gate on existence and version, build the next value off to the
//! side, bind it, apply the expiration, and emit one canonical replication
//! record. Any failure before the bind leaves the key untouched.

use super::args::{AppendArgs, CasArgs, GaeArgs, IncrByArgs, IncrByFloatArgs, SetArgs};
use super::expire::ExpireAction;
use super::numeric::{format_f64, format_i64, parse_f64_strict, parse_i64_strict};
use super::replication::ReplicationRecord;
use super::value::VersionedValue;
use crate::core::error::{ExStringError, ExStringResult};
use crate::core::time::Clock;
use crate::host::{AccessMode, KeyLookup, Keyspace, ReplicationSink};
use bytes::Bytes;
use tracing::debug;

/// Result of `EXINCRBY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrOutcome {
    pub value: i64,
    pub version: u64,
}

/// Result of `EXINCRBYFLOAT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatOutcome {
    /// Rendered result, exactly as stored.
    pub value: Bytes,
    pub version: u64,
}

/// Result of `EXCAS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The key does not exist.
    Missing,
    /// Version mismatch; carries the untouched current value.
    Mismatch(VersionedValue),
    /// Value replaced.
    Swapped { version: u64 },
}

/// Result of `EXCAD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadOutcome {
    Missing,
    Mismatch,
    Deleted,
}

impl CadOutcome {
    /// Integer reply: -1 missing, 0 mismatch, 1 deleted.
    pub fn code(self) -> i64 {
        match self {
            CadOutcome::Missing => -1,
            CadOutcome::Mismatch => 0,
            CadOutcome::Deleted => 1,
        }
    }
}

/// Which end `EXAPPEND` / `EXPREPEND` writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Tail,
    Head,
}

/// Operations over one host.
///
/// Cheap to build; the command layer creates one per command.
pub struct Engine<'a> {
    keyspace: &'a dyn Keyspace,
    clock: &'a dyn Clock,
    replication: &'a dyn ReplicationSink,
    max_value_bytes: usize,
}

impl<'a> Engine<'a> {
    pub fn new(
        keyspace: &'a dyn Keyspace,
        clock: &'a dyn Clock,
        replication: &'a dyn ReplicationSink,
        max_value_bytes: usize,
    ) -> Self {
        Self {
            keyspace,
            clock,
            replication,
            max_value_bytes,
        }
    }

    fn open(&self, key: &[u8], mode: AccessMode) -> ExStringResult<Option<VersionedValue>> {
        match self.keyspace.lookup(key, mode) {
            KeyLookup::Absent => Ok(None),
            KeyLookup::WrongType => Err(ExStringError::WrongType),
            KeyLookup::Bound(value) => Ok(Some(value)),
        }
    }

    fn apply_expire(&self, key: &[u8], action: &ExpireAction) {
        if let Some(expiration) = action.expiration() {
            self.keyspace.set_expire(key, expiration);
        }
    }

    /// `EXSET`. Returns the new version, or `None` when NX/XX blocked it.
    pub fn set(&self, key: &[u8], args: SetArgs) -> ExStringResult<Option<u64>> {
        let now = self.clock.now();
        let expire = args.expire.resolve(now)?;
        let current = self.open(key, AccessMode::Write)?;

        if !args.existence.admits(current.is_some()) {
            debug!(key_len = key.len(), "EXSET skipped by existence gate");
            return Ok(None);
        }
        if let Some(current) = &current {
            args.version.check(current)?;
        }

        let version = args.version.next_version(current.as_ref())?;
        let flags = args
            .flags
            .or(current.as_ref().map(|c| c.flags))
            .unwrap_or(0);
        let record = ReplicationRecord::exset(
            key,
            &args.value,
            version,
            expire.deadline(),
            expire.keeps_ttl(),
            args.flags,
        );

        self.keyspace
            .store(key, VersionedValue::new(version, flags, args.value));
        self.apply_expire(key, &expire);
        self.replication.replicate(record);

        debug!(key_len = key.len(), version, flags, ?expire, "EXSET applied");
        Ok(Some(version))
    }

    /// `EXGET`.
    pub fn get(&self, key: &[u8]) -> ExStringResult<Option<VersionedValue>> {
        self.open(key, AccessMode::Read)
    }

    /// `EXINCRBY`. `None` when NX/XX blocked it.
    pub fn incr_by(&self, key: &[u8], args: IncrByArgs) -> ExStringResult<Option<IncrOutcome>> {
        let now = self.clock.now();
        let expire = args.expire.resolve(now)?;
        let current = self.open(key, AccessMode::Write)?;

        if !args.existence.admits(current.is_some()) {
            debug!(key_len = key.len(), "EXINCRBY skipped by existence gate");
            return Ok(None);
        }

        let mut result = match (&current, args.default) {
            (None, Some(default)) => default,
            (None, None) => add_checked(0, args.increment, &args)?,
            (Some(current), _) => {
                let base = parse_i64_strict(&current.value).ok_or(ExStringError::NotAnInteger)?;
                args.version.check(current)?;
                add_checked(base, args.increment, &args)?
            }
        };
        if args.non_negative {
            result = result.max(0);
        }

        let version = args.version.next_version(current.as_ref())?;
        let flags = current.as_ref().map_or(0, |c| c.flags);
        let value = format_i64(result);
        let record =
            ReplicationRecord::exset(key, &value, version, expire.deadline(), expire.keeps_ttl(), None);

        self.keyspace
            .store(key, VersionedValue::new(version, flags, value));
        self.apply_expire(key, &expire);
        self.replication.replicate(record);

        debug!(key_len = key.len(), result, version, "EXINCRBY applied");
        Ok(Some(IncrOutcome {
            value: result,
            version,
        }))
    }

    /// `EXINCRBYFLOAT`. `None` when NX/XX blocked it.
    pub fn incr_by_float(
        &self,
        key: &[u8],
        args: IncrByFloatArgs,
    ) -> ExStringResult<Option<FloatOutcome>> {
        let now = self.clock.now();
        let expire = args.expire.resolve(now)?;
        let current = self.open(key, AccessMode::Write)?;

        if !args.existence.admits(current.is_some()) {
            debug!(key_len = key.len(), "EXINCRBYFLOAT skipped by existence gate");
            return Ok(None);
        }

        let base = match &current {
            None => 0.0,
            Some(current) => {
                let base = parse_f64_strict(&current.value).ok_or(ExStringError::NotAFloat)?;
                args.version.check(current)?;
                base
            }
        };
        let sum = base + args.increment;
        if !sum.is_finite() || !args.bounds.admits(sum) {
            return Err(ExStringError::Overflow);
        }

        let version = args.version.next_version(current.as_ref())?;
        let flags = current.as_ref().map_or(0, |c| c.flags);
        let value = format_f64(sum);
        let record =
            ReplicationRecord::exset(key, &value, version, expire.deadline(), expire.keeps_ttl(), None);

        self.keyspace
            .store(key, VersionedValue::new(version, flags, value.clone()));
        self.apply_expire(key, &expire);
        self.replication.replicate(record);

        debug!(key_len = key.len(), sum, version, "EXINCRBYFLOAT applied");
        Ok(Some(FloatOutcome { value, version }))
    }

    /// `EXSETVER`. Returns false if the key does not exist.
    pub fn set_version(&self, key: &[u8], version: u64) -> ExStringResult<bool> {
        let Some(mut current) = self.open(key, AccessMode::Write)? else {
            return Ok(false);
        };

        current.version = version;
        self.keyspace.store(key, current);
        self.replication
            .replicate(ReplicationRecord::exsetver(key, version));

        debug!(key_len = key.len(), version, "EXSETVER applied");
        Ok(true)
    }

    /// `EXCAS`.
    pub fn compare_and_swap(&self, key: &[u8], args: CasArgs) -> ExStringResult<CasOutcome> {
        let now = self.clock.now();
        let expire = args.expire.resolve(now)?;
        let Some(current) = self.open(key, AccessMode::Write)? else {
            return Ok(CasOutcome::Missing);
        };

        if current.version != args.expected_version {
            debug!(
                key_len = key.len(),
                expected = args.expected_version,
                actual = current.version,
                "EXCAS version mismatch"
            );
            return Ok(CasOutcome::Mismatch(current));
        }

        let version = current.next_version()?;
        let record = ReplicationRecord::exset(
            key,
            &args.value,
            version,
            expire.deadline(),
            expire.keeps_ttl(),
            None,
        );

        self.keyspace
            .store(key, VersionedValue::new(version, current.flags, args.value));
        self.apply_expire(key, &expire);
        self.replication.replicate(record);

        debug!(key_len = key.len(), version, "EXCAS applied");
        Ok(CasOutcome::Swapped { version })
    }

    /// `EXCAD`.
    pub fn compare_and_delete(&self, key: &[u8], expected: i64) -> ExStringResult<CadOutcome> {
        let Some(current) = self.open(key, AccessMode::Write)? else {
            return Ok(CadOutcome::Missing);
        };

        if u64::try_from(expected).ok() != Some(current.version) {
            return Ok(CadOutcome::Mismatch);
        }

        self.keyspace.delete(key);
        self.replication.replicate(ReplicationRecord::del(key));

        debug!(key_len = key.len(), version = current.version, "EXCAD deleted key");
        Ok(CadOutcome::Deleted)
    }

    /// `EXAPPEND` / `EXPREPEND`. Returns the new version, or `None` when
    /// NX/XX blocked it. The key's expiration is never touched.
    pub fn concat(&self, key: &[u8], args: AppendArgs, side: Side) -> ExStringResult<Option<u64>> {
        let current = self.open(key, AccessMode::Write)?;

        if !args.existence.admits(current.is_some()) {
            debug!(key_len = key.len(), ?side, "concat skipped by existence gate");
            return Ok(None);
        }

        let (value, flags) = match &current {
            None => (args.bytes.clone(), 0),
            Some(current) => {
                args.version.check(current)?;
                let joined = match side {
                    Side::Tail => self.join(&current.value, &args.bytes)?,
                    Side::Head => self.join(&args.bytes, &current.value)?,
                };
                (joined, current.flags)
            }
        };

        let version = args.version.next_version(current.as_ref())?;
        let record = match side {
            Side::Tail => ReplicationRecord::exappend(key, &args.bytes, version),
            Side::Head => ReplicationRecord::exprepend(key, &args.bytes, version),
        };

        let len = value.len();
        self.keyspace
            .store(key, VersionedValue::new(version, flags, value));
        self.replication.replicate(record);

        debug!(key_len = key.len(), ?side, len, version, "concat applied");
        Ok(Some(version))
    }

    /// Build `front ++ back` in a fresh buffer.
    fn join(&self, front: &[u8], back: &[u8]) -> ExStringResult<Bytes> {
        let len = front
            .len()
            .checked_add(back.len())
            .filter(|len| *len <= self.max_value_bytes)
            .ok_or(ExStringError::AppendFailure)?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| ExStringError::AppendFailure)?;
        buf.extend_from_slice(front);
        buf.extend_from_slice(back);
        Ok(Bytes::from(buf))
    }

    /// `EXGAE`. Applies the expiration once and returns the value, or
    /// `None` if the key does not exist.
    pub fn get_and_expire(&self, key: &[u8], args: GaeArgs) -> ExStringResult<Option<VersionedValue>> {
        let now = self.clock.now();
        let resolved = args.expire.resolve(now)?;
        let Some(current) = self.open(key, AccessMode::Write)? else {
            return Ok(None);
        };

        self.keyspace.set_expire(key, resolved.expiration());
        self.replication
            .replicate(ReplicationRecord::exgae(key, resolved.deadline));

        debug!(
            key_len = key.len(),
            relative_ms = resolved.relative_ms,
            "EXGAE applied"
        );
        Ok(Some(current))
    }
}

fn add_checked(base: i64, increment: i64, args: &IncrByArgs) -> ExStringResult<i64> {
    base.checked_add(increment)
        .filter(|sum| args.bounds.admits(*sum))
        .ok_or(ExStringError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::{ManualClock, UnixMillis};
    use crate::host::{MemoryKeyspace, RecordingSink};
    use std::sync::Arc;

    struct Fixture {
        clock: Arc<ManualClock>,
        keyspace: MemoryKeyspace,
        sink: RecordingSink,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(1_000_000));
            Self {
                keyspace: MemoryKeyspace::new(clock.clone()),
                clock,
                sink: RecordingSink::new(),
            }
        }

        fn engine(&self) -> Engine<'_> {
            Engine::new(&self.keyspace, self.clock.as_ref(), &self.sink, 64)
        }
    }

    fn tokens(items: &[&str]) -> Vec<Bytes> {
        items
            .iter()
            .map(|s| Bytes::copy_from_slice(s.as_bytes()))
            .collect()
    }

    fn set_args(value: &str, opts: &[&str]) -> SetArgs {
        SetArgs::parse(Bytes::copy_from_slice(value.as_bytes()), &tokens(opts)).unwrap()
    }

    fn incr_args(n: &str, opts: &[&str]) -> IncrByArgs {
        IncrByArgs::parse(n.as_bytes(), &tokens(opts)).unwrap()
    }

    #[test]
    fn test_set_creates_and_advances() {
        let fx = Fixture::new();
        let engine = fx.engine();

        assert_eq!(engine.set(b"k", set_args("a", &[])).unwrap(), Some(1));
        assert_eq!(engine.set(b"k", set_args("b", &[])).unwrap(), Some(2));
        let v = engine.get(b"k").unwrap().unwrap();
        assert_eq!(v.version, 2);
        assert_eq!(&v.value[..], b"b");
    }

    #[test]
    fn test_set_gates() {
        let fx = Fixture::new();
        let engine = fx.engine();

        assert_eq!(engine.set(b"k", set_args("a", &["XX"])).unwrap(), None);
        assert!(engine.get(b"k").unwrap().is_none());
        assert_eq!(engine.set(b"k", set_args("a", &["NX"])).unwrap(), Some(1));
        assert_eq!(engine.set(b"k", set_args("b", &["NX"])).unwrap(), None);

        assert_eq!(
            engine.set(b"k", set_args("b", &["VER", "5"])),
            Err(ExStringError::StaleVersion)
        );
        assert_eq!(engine.set(b"k", set_args("b", &["VER", "1"])).unwrap(), Some(2));
        assert_eq!(engine.set(b"k", set_args("c", &["VER", "0"])).unwrap(), Some(3));
        assert_eq!(fx.sink.len(), 3);
    }

    #[test]
    fn test_set_version_check_ignored_on_absent_key() {
        let fx = Fixture::new();
        assert_eq!(fx.engine().set(b"k", set_args("a", &["VER", "9"])).unwrap(), Some(1));
    }

    #[test]
    fn test_set_flags_preserved() {
        let fx = Fixture::new();
        let engine = fx.engine();
        engine.set(b"k", set_args("a", &["FLAGS", "7"])).unwrap();
        engine.set(b"k", set_args("b", &[])).unwrap();
        assert_eq!(engine.get(b"k").unwrap().unwrap().flags, 7);
    }

    #[test]
    fn test_set_expiration_and_keepttl() {
        let fx = Fixture::new();
        let engine = fx.engine();

        engine.set(b"k", set_args("a", &["PX", "500"])).unwrap();
        assert_eq!(fx.keyspace.expire_at(b"k"), Some(UnixMillis::new(1_000_500)));

        engine.set(b"k", set_args("b", &["KEEPTTL"])).unwrap();
        assert_eq!(fx.keyspace.expire_at(b"k"), Some(UnixMillis::new(1_000_500)));

        engine.set(b"k", set_args("c", &[])).unwrap();
        assert_eq!(fx.keyspace.expire_at(b"k"), None);

        let records: Vec<String> = fx.sink.records().iter().map(|r| r.to_string()).collect();
        assert_eq!(
            records,
            vec![
                "EXSET k a ABS 1 PXAT 1000500",
                "EXSET k b ABS 2 KEEPTTL",
                "EXSET k c ABS 3",
            ]
        );
    }

    #[test]
    fn test_wrong_type() {
        let fx = Fixture::new();
        fx.keyspace.set_plain(b"p", "plain");
        let engine = fx.engine();
        assert_eq!(engine.get(b"p"), Err(ExStringError::WrongType));
        assert_eq!(
            engine.set(b"p", set_args("a", &[])),
            Err(ExStringError::WrongType)
        );
        assert!(fx.sink.is_empty());
    }

    #[test]
    fn test_incr_by_default_is_terminal() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let out = engine
            .incr_by(b"k", incr_args("5", &["DEF", "100", "MAX", "10"]))
            .unwrap()
            .unwrap();
        assert_eq!(out, IncrOutcome { value: 100, version: 1 });

        let out = engine.incr_by(b"k", incr_args("5", &[])).unwrap().unwrap();
        assert_eq!(out, IncrOutcome { value: 105, version: 2 });
    }

    #[test]
    fn test_incr_by_overflow_leaves_value() {
        let fx = Fixture::new();
        let engine = fx.engine();
        engine
            .set(b"k", set_args(&i64::MAX.to_string(), &[]))
            .unwrap();
        assert_eq!(
            engine.incr_by(b"k", incr_args("1", &[])),
            Err(ExStringError::Overflow)
        );
        let v = engine.get(b"k").unwrap().unwrap();
        assert_eq!(v.value, Bytes::from(i64::MAX.to_string()));
        assert_eq!(v.version, 1);
    }

    #[test]
    fn test_incr_by_bounds_and_clamp() {
        let fx = Fixture::new();
        let engine = fx.engine();
        engine.set(b"k", set_args("3", &[])).unwrap();

        assert_eq!(
            engine.incr_by(b"k", incr_args("-5", &["MIN", "0"])),
            Err(ExStringError::Overflow)
        );
        let out = engine
            .incr_by(b"k", incr_args("-5", &["NONEGATIVE"]))
            .unwrap()
            .unwrap();
        assert_eq!(out.value, 0);
        assert_eq!(out.version, 2);
    }

    #[test]
    fn test_incr_by_not_an_integer() {
        let fx = Fixture::new();
        let engine = fx.engine();
        engine.set(b"k", set_args("abc", &[])).unwrap();
        assert_eq!(
            engine.incr_by(b"k", incr_args("1", &[])),
            Err(ExStringError::NotAnInteger)
        );
    }

    #[test]
    fn test_incr_by_float() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let args = IncrByFloatArgs::parse(b"1.5", &[]).unwrap();
        let out = engine.incr_by_float(b"k", args).unwrap().unwrap();
        assert_eq!(out.value, Bytes::from_static(b"1.5"));
        assert_eq!(out.version, 1);

        let args = IncrByFloatArgs::parse(b"inf", &[]).unwrap();
        assert_eq!(engine.incr_by_float(b"k", args), Err(ExStringError::Overflow));
        assert_eq!(
            engine.get(b"k").unwrap().unwrap().value,
            Bytes::from_static(b"1.5")
        );
    }

    #[test]
    fn test_set_version_op() {
        let fx = Fixture::new();
        let engine = fx.engine();
        assert!(!engine.set_version(b"k", 5).unwrap());
        engine.set(b"k", set_args("a", &["EX", "10"])).unwrap();
        assert!(engine.set_version(b"k", 50).unwrap());
        assert_eq!(engine.get(b"k").unwrap().unwrap().version, 50);
        assert!(fx.keyspace.expire_at(b"k").is_some());
    }

    #[test]
    fn test_cas_and_cad() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let cas = |value: &str, version: &str| {
            CasArgs::parse(Bytes::copy_from_slice(value.as_bytes()), version.as_bytes(), &[]).unwrap()
        };

        assert_eq!(engine.compare_and_swap(b"k", cas("x", "1")).unwrap(), CasOutcome::Missing);
        engine.set(b"k", set_args("a", &["FLAGS", "3"])).unwrap();

        assert_eq!(
            engine.compare_and_swap(b"k", cas("x", "1")).unwrap(),
            CasOutcome::Swapped { version: 2 }
        );
        match engine.compare_and_swap(b"k", cas("y", "1")).unwrap() {
            CasOutcome::Mismatch(current) => {
                assert_eq!(&current.value[..], b"x");
                assert_eq!(current.version, 2);
                assert_eq!(current.flags, 3);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(engine.compare_and_delete(b"k", 1).unwrap(), CadOutcome::Mismatch);
        assert_eq!(engine.compare_and_delete(b"k", -2).unwrap(), CadOutcome::Mismatch);
        assert_eq!(engine.compare_and_delete(b"k", 2).unwrap(), CadOutcome::Deleted);
        assert_eq!(engine.compare_and_delete(b"k", 2).unwrap(), CadOutcome::Missing);
        assert_eq!(fx.sink.records().last().unwrap().to_string(), "DEL k");
    }

    #[test]
    fn test_concat() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let args = |bytes: &'static [u8], opts: &[&str]| {
            AppendArgs::parse(Bytes::from_static(bytes), &tokens(opts)).unwrap()
        };

        assert_eq!(engine.concat(b"k", args(b"mid", &["XX"]), Side::Tail).unwrap(), None);
        assert_eq!(engine.concat(b"k", args(b"mid", &[]), Side::Head).unwrap(), Some(1));
        assert_eq!(engine.concat(b"k", args(b"-end", &[]), Side::Tail).unwrap(), Some(2));
        assert_eq!(engine.concat(b"k", args(b"start-", &[]), Side::Head).unwrap(), Some(3));
        assert_eq!(
            engine.get(b"k").unwrap().unwrap().value,
            Bytes::from_static(b"start-mid-end")
        );
        assert_eq!(
            engine.concat(b"k", args(b"x", &["ABS", "100"]), Side::Tail).unwrap(),
            Some(100)
        );
    }

    #[test]
    fn test_concat_limit() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let big = Bytes::from(vec![b'a'; 40]);
        engine
            .concat(b"k", AppendArgs::parse(big.clone(), &[]).unwrap(), Side::Tail)
            .unwrap();
        assert_eq!(
            engine.concat(b"k", AppendArgs::parse(big, &[]).unwrap(), Side::Tail),
            Err(ExStringError::AppendFailure)
        );
        assert_eq!(engine.get(b"k").unwrap().unwrap().len(), 40);
    }

    #[test]
    fn test_concat_keeps_expiration() {
        let fx = Fixture::new();
        let engine = fx.engine();
        engine.set(b"k", set_args("a", &["PX", "100"])).unwrap();
        engine
            .concat(b"k", AppendArgs::parse(Bytes::from_static(b"b"), &[]).unwrap(), Side::Tail)
            .unwrap();
        assert_eq!(fx.keyspace.expire_at(b"k"), Some(UnixMillis::new(1_000_100)));
    }

    #[test]
    fn test_get_and_expire() {
        let fx = Fixture::new();
        let engine = fx.engine();
        let args = GaeArgs::parse(&tokens(&["EX", "2"])).unwrap();
        assert_eq!(engine.get_and_expire(b"k", args).unwrap(), None);

        engine.set(b"k", set_args("v", &[])).unwrap();
        let v = engine.get_and_expire(b"k", args).unwrap().unwrap();
        assert_eq!(&v.value[..], b"v");
        assert_eq!(fx.keyspace.expire_at(b"k"), Some(UnixMillis::new(1_002_000)));
        assert_eq!(
            fx.sink.records().last().unwrap().to_string(),
            "EXGAE k PXAT 1002000"
        );
    }
}
