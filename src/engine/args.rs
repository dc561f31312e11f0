//! Typed command arguments.
//!
//! Raw option tokens become validated values here. Each command has its own
//! argument struct, built with a `parse` constructor that runs the option
//! grammar and then checks every literal. Which error a bad literal produces
//! is command specific and mirrors what clients of these commands expect.

use super::expire::{ExpirePolicy, ExpireSpec};
use super::numeric::{parse_f64_strict, parse_i64_strict};
use super::options::{self, OptionSet, ParsedOptions};
use super::value::VersionedValue;
use crate::core::error::{ExStringError, ExStringResult};
use bytes::Bytes;

/// `NX` / `XX` gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Existence {
    #[default]
    Any,
    /// `NX`: only act on an absent key.
    IfAbsent,
    /// `XX`: only act on a bound key.
    IfPresent,
}

impl Existence {
    fn from_options(options: &ParsedOptions) -> Self {
        if options.has(OptionSet::NX) {
            Existence::IfAbsent
        } else if options.has(OptionSet::XX) {
            Existence::IfPresent
        } else {
            Existence::Any
        }
    }

    /// Whether a key in the given state passes the gate.
    pub fn admits(self, exists: bool) -> bool {
        match self {
            Existence::Any => true,
            Existence::IfAbsent => !exists,
            Existence::IfPresent => exists,
        }
    }
}

/// `VER` / `ABS` handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionSpec {
    #[default]
    Unchecked,
    /// `VER n`: require the current version to equal n (0 skips the check).
    Check(u64),
    /// `ABS n`: store n as the new version without checking.
    Absolute(u64),
}

impl VersionSpec {
    fn from_options(options: &ParsedOptions) -> ExStringResult<Self> {
        let Some(raw) = options.version() else {
            return Ok(VersionSpec::Unchecked);
        };
        let version = parse_non_negative(raw).ok_or(ExStringError::Syntax)?;
        if options.has(OptionSet::ABS) {
            Ok(VersionSpec::Absolute(version))
        } else {
            Ok(VersionSpec::Check(version))
        }
    }

    /// Gate a mutation of a bound value.
    pub fn check(&self, current: &VersionedValue) -> ExStringResult<()> {
        match self {
            VersionSpec::Check(expected) => current.check_version(*expected),
            _ => Ok(()),
        }
    }

    /// Version the mutated value will carry.
    pub fn next_version(&self, current: Option<&VersionedValue>) -> ExStringResult<u64> {
        match self {
            VersionSpec::Absolute(version) => Ok(*version),
            _ => current.map_or(Ok(1), VersionedValue::next_version),
        }
    }
}

/// Inclusive numeric bounds from `MIN` / `MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    fn from_options(
        options: &ParsedOptions,
        parse: impl Fn(&[u8]) -> Option<T>,
    ) -> ExStringResult<Self> {
        let read = |raw: Option<&Bytes>| {
            raw.map(|raw| parse(&raw[..]).ok_or(ExStringError::InvalidBounds))
                .transpose()
        };
        let bounds = Self {
            min: read(options.min())?,
            max: read(options.max())?,
        };
        if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
            if max < min {
                return Err(ExStringError::InvalidBounds);
            }
        }
        Ok(bounds)
    }

    /// Whether a result stays inside the bounds.
    pub fn admits(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

fn parse_non_negative(raw: &[u8]) -> Option<u64> {
    parse_i64_strict(raw).and_then(|v| u64::try_from(v).ok())
}

fn parse_flags(raw: &[u8]) -> ExStringResult<u32> {
    parse_i64_strict(raw)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(ExStringError::Syntax)
}

/// `EXSET key value [options]`
#[derive(Debug, Clone)]
pub struct SetArgs {
    pub value: Bytes,
    pub existence: Existence,
    pub version: VersionSpec,
    pub flags: Option<u32>,
    pub expire: ExpirePolicy,
    pub with_version: bool,
}

impl SetArgs {
    pub fn parse(value: Bytes, tokens: &[Bytes]) -> ExStringResult<Self> {
        let options = options::parse(tokens, OptionSet::EXSET)?;
        let expire = ExpirePolicy::from_options(&options)?;
        let version = VersionSpec::from_options(&options)?;
        let flags = options.flags().map(|raw| parse_flags(raw)).transpose()?;

        Ok(Self {
            value,
            existence: Existence::from_options(&options),
            version,
            flags,
            expire,
            with_version: options.has(OptionSet::WITHVERSION),
        })
    }
}

/// `EXINCRBY key increment [options]`
#[derive(Debug, Clone)]
pub struct IncrByArgs {
    pub increment: i64,
    /// Terminal value used when the key is absent.
    pub default: Option<i64>,
    pub existence: Existence,
    pub version: VersionSpec,
    pub bounds: Bounds<i64>,
    pub non_negative: bool,
    pub expire: ExpirePolicy,
    pub with_version: bool,
}

impl IncrByArgs {
    pub fn parse(increment: &[u8], tokens: &[Bytes]) -> ExStringResult<Self> {
        let options = options::parse(tokens, OptionSet::EXINCRBY)?;
        let increment = parse_i64_strict(increment).ok_or(ExStringError::NotAnInteger)?;
        let default = options
            .default_value()
            .map(|raw| parse_i64_strict(raw).ok_or(ExStringError::NotAnInteger))
            .transpose()?;
        let expire = ExpirePolicy::from_options(&options)?;
        let version = VersionSpec::from_options(&options)?;
        let bounds = Bounds::from_options(&options, parse_i64_strict)?;

        Ok(Self {
            increment,
            default,
            existence: Existence::from_options(&options),
            version,
            bounds,
            non_negative: options.has(OptionSet::NONEGATIVE),
            expire,
            with_version: options.has(OptionSet::WITHVERSION),
        })
    }
}

/// `EXINCRBYFLOAT key increment [options]`
#[derive(Debug, Clone)]
pub struct IncrByFloatArgs {
    pub increment: f64,
    pub existence: Existence,
    pub version: VersionSpec,
    pub bounds: Bounds<f64>,
    pub expire: ExpirePolicy,
}

impl IncrByFloatArgs {
    pub fn parse(increment: &[u8], tokens: &[Bytes]) -> ExStringResult<Self> {
        let increment = parse_f64_strict(increment).ok_or(ExStringError::NotAFloat)?;
        let options = options::parse(tokens, OptionSet::EXINCRBYFLOAT)?;
        let expire = ExpirePolicy::from_options(&options)?;
        let version = VersionSpec::from_options(&options)?;
        let bounds = Bounds::from_options(&options, parse_f64_strict)?;

        Ok(Self {
            increment,
            existence: Existence::from_options(&options),
            version,
            bounds,
            expire,
        })
    }
}

/// Version for `EXSETVER key version`. Must be a positive integer.
pub fn parse_set_version(raw: &[u8]) -> ExStringResult<u64> {
    parse_non_negative(raw)
        .filter(|v| *v > 0)
        .ok_or(ExStringError::Syntax)
}

/// `EXCAS key value version [options]`
#[derive(Debug, Clone)]
pub struct CasArgs {
    pub value: Bytes,
    pub expected_version: u64,
    pub expire: ExpirePolicy,
}

impl CasArgs {
    pub fn parse(value: Bytes, version: &[u8], tokens: &[Bytes]) -> ExStringResult<Self> {
        let options = options::parse(tokens, OptionSet::EXCAS)?;
        let expire = ExpirePolicy::from_options(&options)?;
        let version = parse_i64_strict(version).ok_or(ExStringError::VersionNotInteger)?;
        let expected_version = u64::try_from(version).map_err(|_| ExStringError::Syntax)?;

        Ok(Self {
            value,
            expected_version,
            expire,
        })
    }
}

/// Version for `EXCAD key version`.
///
/// Negative versions are accepted and simply never match.
pub fn parse_cad_version(raw: &[u8]) -> ExStringResult<i64> {
    parse_i64_strict(raw).ok_or(ExStringError::Syntax)
}

/// `EXAPPEND` / `EXPREPEND key value [options]`
#[derive(Debug, Clone)]
pub struct AppendArgs {
    pub bytes: Bytes,
    pub existence: Existence,
    pub version: VersionSpec,
}

impl AppendArgs {
    pub fn parse(bytes: Bytes, tokens: &[Bytes]) -> ExStringResult<Self> {
        let options = options::parse(tokens, OptionSet::EXAPPEND)?;
        let version = VersionSpec::from_options(&options)?;

        Ok(Self {
            bytes,
            existence: Existence::from_options(&options),
            version,
        })
    }
}

/// `EXGAE key EX|EXAT|PX|PXAT time`
#[derive(Debug, Clone, Copy)]
pub struct GaeArgs {
    pub expire: ExpireSpec,
}

impl GaeArgs {
    pub fn parse(tokens: &[Bytes]) -> ExStringResult<Self> {
        let options = options::parse(tokens, OptionSet::EXGAE)?;
        let expire = ExpireSpec::from_options(&options)?.ok_or(ExStringError::Syntax)?;
        Ok(Self { expire })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<Bytes> {
        items
            .iter()
            .map(|s| Bytes::copy_from_slice(s.as_bytes()))
            .collect()
    }

    #[test]
    fn test_set_args_defaults() {
        let args = SetArgs::parse(Bytes::from_static(b"v"), &[]).unwrap();
        assert_eq!(args.existence, Existence::Any);
        assert_eq!(args.version, VersionSpec::Unchecked);
        assert_eq!(args.flags, None);
        assert_eq!(args.expire, ExpirePolicy::Clear);
        assert!(!args.with_version);
    }

    #[test]
    fn test_set_args_literals() {
        let args = SetArgs::parse(
            Bytes::from_static(b"v"),
            &tokens(&["XX", "ABS", "10", "FLAGS", "4294967295", "KEEPTTL", "WITHVERSION"]),
        )
        .unwrap();
        assert_eq!(args.existence, Existence::IfPresent);
        assert_eq!(args.version, VersionSpec::Absolute(10));
        assert_eq!(args.flags, Some(u32::MAX));
        assert_eq!(args.expire, ExpirePolicy::Keep);
        assert!(args.with_version);
    }

    #[test]
    fn test_set_args_syntax_errors() {
        let v = || Bytes::from_static(b"v");
        for bad in [
            vec!["EX", "0"],
            vec!["PX", "-1"],
            vec!["VER", "-1"],
            vec!["VER", "x"],
            vec!["FLAGS", "-1"],
            vec!["FLAGS", "4294967296"],
        ] {
            assert_eq!(
                SetArgs::parse(v(), &tokens(&bad)).unwrap_err(),
                ExStringError::Syntax,
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_incrby_errors() {
        assert_eq!(
            IncrByArgs::parse(b"x", &[]).unwrap_err(),
            ExStringError::NotAnInteger
        );
        assert_eq!(
            IncrByArgs::parse(b"1", &tokens(&["DEF", "y"])).unwrap_err(),
            ExStringError::NotAnInteger
        );
        assert_eq!(
            IncrByArgs::parse(b"1", &tokens(&["MIN", "a"])).unwrap_err(),
            ExStringError::InvalidBounds
        );
        assert_eq!(
            IncrByArgs::parse(b"1", &tokens(&["MIN", "5", "MAX", "4"])).unwrap_err(),
            ExStringError::InvalidBounds
        );
        assert_eq!(
            IncrByArgs::parse(b"1", &tokens(&["EX", "x"])).unwrap_err(),
            ExStringError::Syntax
        );
    }

    #[test]
    fn test_incrbyfloat_errors() {
        assert_eq!(
            IncrByFloatArgs::parse(b"abc", &[]).unwrap_err(),
            ExStringError::NotAFloat
        );
        assert_eq!(
            IncrByFloatArgs::parse(b"1.5", &tokens(&["MAX", "z"])).unwrap_err(),
            ExStringError::InvalidBounds
        );
        let args = IncrByFloatArgs::parse(b"1.5", &tokens(&["MIN", "-1.5", "MAX", "2"])).unwrap();
        assert!(args.bounds.admits(2.0));
        assert!(!args.bounds.admits(2.5));
    }

    #[test]
    fn test_bounds_admit() {
        let bounds = Bounds {
            min: Some(-3i64),
            max: None,
        };
        assert!(bounds.admits(-3));
        assert!(bounds.admits(i64::MAX));
        assert!(!bounds.admits(-4));
    }

    #[test]
    fn test_cas_version_errors() {
        let v = || Bytes::from_static(b"v");
        assert_eq!(
            CasArgs::parse(v(), b"abc", &[]).unwrap_err(),
            ExStringError::VersionNotInteger
        );
        assert_eq!(
            CasArgs::parse(v(), b"-1", &[]).unwrap_err(),
            ExStringError::Syntax
        );
        assert_eq!(
            CasArgs::parse(v(), b"1", &tokens(&["NX"])).unwrap_err(),
            ExStringError::Syntax
        );
        assert_eq!(CasArgs::parse(v(), b"3", &[]).unwrap().expected_version, 3);
    }

    #[test]
    fn test_set_version() {
        assert_eq!(parse_set_version(b"5"), Ok(5));
        assert_eq!(parse_set_version(b"0"), Err(ExStringError::Syntax));
        assert_eq!(parse_set_version(b"-2"), Err(ExStringError::Syntax));
        assert_eq!(parse_set_version(b"v"), Err(ExStringError::Syntax));
    }

    #[test]
    fn test_gae_requires_expiration() {
        assert!(GaeArgs::parse(&tokens(&["PX", "100"])).is_ok());
        assert_eq!(
            GaeArgs::parse(&tokens(&["KEEPTTL"])).unwrap_err(),
            ExStringError::Syntax
        );
        assert_eq!(GaeArgs::parse(&[]).unwrap_err(), ExStringError::Syntax);
    }

    #[test]
    fn test_version_spec_next() {
        let current = VersionedValue::new(4, 0, Bytes::new());
        assert_eq!(VersionSpec::Unchecked.next_version(None), Ok(1));
        assert_eq!(VersionSpec::Check(4).next_version(Some(&current)), Ok(5));
        assert_eq!(VersionSpec::Absolute(0).next_version(Some(&current)), Ok(0));
        assert_eq!(
            VersionSpec::Check(3).check(&current),
            Err(ExStringError::StaleVersion)
        );
    }
}
