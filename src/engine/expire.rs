//! Expiration arithmetic.
//!
//! Clients give expirations four ways (`EX`, `PX`, `EXAT`, `PXAT`). The host
//! only understands "expire in N milliseconds" and replicas only understand
//! absolute deadlines, so every request is resolved against a single sample
//! of the clock into both forms.

use super::options::{ExpireMode, OptionSet, ParsedOptions};
use super::numeric::parse_i64_strict;
use crate::core::error::{ExStringError, ExStringResult};
use crate::core::time::UnixMillis;

/// What the host is told to do with a key's expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Remove any expiration.
    Persist,
    /// Expire after the given number of milliseconds (0 = now).
    In { ms: i64 },
}

/// A validated expiration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpireSpec {
    mode: ExpireMode,
    amount: i64,
}

impl ExpireSpec {
    /// Validate a raw literal. Non-integers and values <= 0 are syntax errors.
    pub fn parse(mode: ExpireMode, raw: &[u8]) -> ExStringResult<Self> {
        let amount = parse_i64_strict(raw).ok_or(ExStringError::Syntax)?;
        if amount <= 0 {
            return Err(ExStringError::Syntax);
        }
        Ok(Self { mode, amount })
    }

    /// Read the expiration option, if any.
    pub fn from_options(options: &ParsedOptions) -> ExStringResult<Option<Self>> {
        options
            .expire()
            .map(|(mode, raw)| Self::parse(mode, raw))
            .transpose()
    }

    /// The mode the client used.
    pub fn mode(&self) -> ExpireMode {
        self.mode
    }

    /// Resolve into a relative duration and an absolute deadline.
    ///
    /// Past deadlines clamp to zero, so the key expires immediately.
    pub fn resolve(&self, now: UnixMillis) -> ExStringResult<ResolvedExpire> {
        let ms = if self.mode.is_seconds() {
            self.amount
                .checked_mul(1000)
                .ok_or(ExStringError::Syntax)?
        } else {
            self.amount
        };

        let relative_ms = if self.mode.is_absolute() {
            now.ms_until(UnixMillis::new(ms))
        } else {
            ms
        };
        let deadline = now
            .as_millis()
            .checked_add(relative_ms)
            .ok_or(ExStringError::Syntax)?;

        Ok(ResolvedExpire {
            relative_ms,
            deadline: UnixMillis::new(deadline),
        })
    }
}

/// An expiration resolved against one clock sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedExpire {
    /// Milliseconds from now, never negative.
    pub relative_ms: i64,
    /// Absolute deadline carried in replication records.
    pub deadline: UnixMillis,
}

impl ResolvedExpire {
    /// Instruction for the host.
    pub fn expiration(&self) -> Expiration {
        Expiration::In {
            ms: self.relative_ms,
        }
    }
}

/// What a mutating command does to the key's expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpirePolicy {
    /// No expiration option: drop any existing expiration.
    #[default]
    Clear,
    /// `KEEPTTL`: leave the existing expiration alone.
    Keep,
    /// Apply a new expiration.
    Set(ExpireSpec),
}

impl ExpirePolicy {
    /// Read the expiration group from parsed options.
    pub fn from_options(options: &ParsedOptions) -> ExStringResult<Self> {
        if let Some(spec) = ExpireSpec::from_options(options)? {
            return Ok(ExpirePolicy::Set(spec));
        }
        if options.has(OptionSet::KEEPTTL) {
            return Ok(ExpirePolicy::Keep);
        }
        Ok(ExpirePolicy::Clear)
    }

    /// Resolve against the command's clock sample.
    pub fn resolve(&self, now: UnixMillis) -> ExStringResult<ExpireAction> {
        Ok(match self {
            ExpirePolicy::Clear => ExpireAction::Clear,
            ExpirePolicy::Keep => ExpireAction::Keep,
            ExpirePolicy::Set(spec) => ExpireAction::Set(spec.resolve(now)?),
        })
    }
}

/// A resolved [`ExpirePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireAction {
    Clear,
    Keep,
    Set(ResolvedExpire),
}

impl ExpireAction {
    /// Instruction for the host, or `None` to leave the key's expiration as is.
    pub fn expiration(&self) -> Option<Expiration> {
        match self {
            ExpireAction::Clear => Some(Expiration::Persist),
            ExpireAction::Keep => None,
            ExpireAction::Set(resolved) => Some(resolved.expiration()),
        }
    }

    /// Deadline to replicate, if one was set.
    pub fn deadline(&self) -> Option<UnixMillis> {
        match self {
            ExpireAction::Set(resolved) => Some(resolved.deadline),
            _ => None,
        }
    }

    /// Whether the existing expiration is kept.
    pub fn keeps_ttl(&self) -> bool {
        matches!(self, ExpireAction::Keep)
    }
}
