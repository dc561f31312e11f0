//! Trailing option grammar shared by the extended string commands.
//!
//! Each command declares the options it accepts as an [`OptionSet`]. The
//! parser walks the trailing tokens once, matches keywords case-insensitively,
//! enforces the exclusion groups, and captures the raw value tokens. Numeric
//! validation is left to [`crate::engine::args`], because the error a bad
//! literal produces depends on the command.
//!
//! # Exclusion groups
//!
//! | Group | Members |
//! |-------|---------|
//! | existence | `NX`, `XX` |
//! | expiration | `EX`, `PX`, `EXAT`, `PXAT`, `KEEPTTL` |
//! | version | `VER`, `ABS` |
//! | singletons | `FLAGS`, `DEF`, `MIN`, `MAX` |
//!
//! A valued keyword conflicts with every member of its group, itself
//! included. A bare keyword only conflicts with the other members, so
//! `NX NX` is accepted while `NX XX` is not.

use crate::core::error::{ExStringError, ExStringResult};
use bytes::Bytes;

bitflags::bitflags! {
    /// A set of option kinds, used both for what a command allows and for
    /// what a parse found.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OptionSet: u16 {
        const NX = 1 << 0;
        const XX = 1 << 1;
        const EX = 1 << 2;
        const PX = 1 << 3;
        const EXAT = 1 << 4;
        const PXAT = 1 << 5;
        const KEEPTTL = 1 << 6;
        const VER = 1 << 7;
        const ABS = 1 << 8;
        const FLAGS = 1 << 9;
        const DEF = 1 << 10;
        const MIN = 1 << 11;
        const MAX = 1 << 12;
        const NONEGATIVE = 1 << 13;
        const WITHVERSION = 1 << 14;
    }
}

impl Default for OptionSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl OptionSet {
    /// `NX` / `XX`.
    pub const EXISTENCE: Self = Self::NX.union(Self::XX);

    /// Expiration options that carry a time.
    pub const EXPIRE_TIME: Self = Self::EX.union(Self::PX).union(Self::EXAT).union(Self::PXAT);

    /// Expiration group, `KEEPTTL` included.
    pub const EXPIRE: Self = Self::EXPIRE_TIME.union(Self::KEEPTTL);

    /// `VER` / `ABS`.
    pub const VERSION: Self = Self::VER.union(Self::ABS);

    /// `MIN` / `MAX`.
    pub const BOUNDS: Self = Self::MIN.union(Self::MAX);

    /// Options accepted by `EXSET`.
    pub const EXSET: Self = Self::EXISTENCE
        .union(Self::EXPIRE)
        .union(Self::VERSION)
        .union(Self::FLAGS)
        .union(Self::WITHVERSION);

    /// Options accepted by `EXINCRBY`.
    pub const EXINCRBY: Self = Self::EXISTENCE
        .union(Self::EXPIRE)
        .union(Self::VERSION)
        .union(Self::DEF)
        .union(Self::BOUNDS)
        .union(Self::NONEGATIVE)
        .union(Self::WITHVERSION);

    /// Options accepted by `EXINCRBYFLOAT`.
    pub const EXINCRBYFLOAT: Self = Self::EXISTENCE
        .union(Self::EXPIRE)
        .union(Self::VERSION)
        .union(Self::BOUNDS);

    /// Options accepted by `EXCAS`.
    pub const EXCAS: Self = Self::EXPIRE;

    /// Options accepted by `EXAPPEND` and `EXPREPEND`.
    pub const EXAPPEND: Self = Self::EXISTENCE.union(Self::VERSION);

    /// Options accepted by `EXGAE`.
    pub const EXGAE: Self = Self::EXPIRE_TIME;
}

/// One recognised option keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Nx,
    Xx,
    Ex,
    Px,
    ExAt,
    PxAt,
    KeepTtl,
    Ver,
    Abs,
    Flags,
    Def,
    Min,
    Max,
    NoNegative,
    WithVersion,
}

impl OptionKind {
    /// Every kind, in keyword table order.
    pub const ALL: [OptionKind; 15] = [
        OptionKind::Nx,
        OptionKind::Xx,
        OptionKind::Ex,
        OptionKind::Px,
        OptionKind::ExAt,
        OptionKind::PxAt,
        OptionKind::KeepTtl,
        OptionKind::Ver,
        OptionKind::Abs,
        OptionKind::Flags,
        OptionKind::Def,
        OptionKind::Min,
        OptionKind::Max,
        OptionKind::NoNegative,
        OptionKind::WithVersion,
    ];

    /// Canonical (uppercase) keyword.
    pub const fn keyword(self) -> &'static str {
        match self {
            OptionKind::Nx => "NX",
            OptionKind::Xx => "XX",
            OptionKind::Ex => "EX",
            OptionKind::Px => "PX",
            OptionKind::ExAt => "EXAT",
            OptionKind::PxAt => "PXAT",
            OptionKind::KeepTtl => "KEEPTTL",
            OptionKind::Ver => "VER",
            OptionKind::Abs => "ABS",
            OptionKind::Flags => "FLAGS",
            OptionKind::Def => "DEF",
            OptionKind::Min => "MIN",
            OptionKind::Max => "MAX",
            OptionKind::NoNegative => "NONEGATIVE",
            OptionKind::WithVersion => "WITHVERSION",
        }
    }

    /// Whether the keyword consumes the following token.
    pub const fn takes_value(self) -> bool {
        !matches!(
            self,
            OptionKind::Nx
                | OptionKind::Xx
                | OptionKind::KeepTtl
                | OptionKind::NoNegative
                | OptionKind::WithVersion
        )
    }

    /// The bit for this kind.
    pub const fn flag(self) -> OptionSet {
        match self {
            OptionKind::Nx => OptionSet::NX,
            OptionKind::Xx => OptionSet::XX,
            OptionKind::Ex => OptionSet::EX,
            OptionKind::Px => OptionSet::PX,
            OptionKind::ExAt => OptionSet::EXAT,
            OptionKind::PxAt => OptionSet::PXAT,
            OptionKind::KeepTtl => OptionSet::KEEPTTL,
            OptionKind::Ver => OptionSet::VER,
            OptionKind::Abs => OptionSet::ABS,
            OptionKind::Flags => OptionSet::FLAGS,
            OptionKind::Def => OptionSet::DEF,
            OptionKind::Min => OptionSet::MIN,
            OptionKind::Max => OptionSet::MAX,
            OptionKind::NoNegative => OptionSet::NONEGATIVE,
            OptionKind::WithVersion => OptionSet::WITHVERSION,
        }
    }

    /// Members of the exclusion group this kind belongs to.
    pub const fn group(self) -> OptionSet {
        match self {
            OptionKind::Nx | OptionKind::Xx => OptionSet::EXISTENCE,
            OptionKind::Ex
            | OptionKind::Px
            | OptionKind::ExAt
            | OptionKind::PxAt
            | OptionKind::KeepTtl => OptionSet::EXPIRE,
            OptionKind::Ver | OptionKind::Abs => OptionSet::VERSION,
            OptionKind::Flags => OptionSet::FLAGS,
            OptionKind::Def => OptionSet::DEF,
            OptionKind::Min => OptionSet::MIN,
            OptionKind::Max => OptionSet::MAX,
            OptionKind::NoNegative | OptionKind::WithVersion => OptionSet::empty(),
        }
    }

    /// Options that may not already be present when this one is seen.
    pub fn conflicts(self) -> OptionSet {
        if self.takes_value() {
            self.group()
        } else {
            self.group().difference(self.flag())
        }
    }

    /// Match a token against the keyword table, ignoring ASCII case.
    pub fn from_token(token: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| token.eq_ignore_ascii_case(kind.keyword().as_bytes()))
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How an expiration literal is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireMode {
    /// Relative seconds.
    Ex,
    /// Relative milliseconds.
    Px,
    /// Absolute Unix seconds.
    ExAt,
    /// Absolute Unix milliseconds.
    PxAt,
}

impl ExpireMode {
    fn from_kind(kind: OptionKind) -> Option<Self> {
        match kind {
            OptionKind::Ex => Some(ExpireMode::Ex),
            OptionKind::Px => Some(ExpireMode::Px),
            OptionKind::ExAt => Some(ExpireMode::ExAt),
            OptionKind::PxAt => Some(ExpireMode::PxAt),
            _ => None,
        }
    }

    /// Whether the literal is a wall-clock deadline.
    pub const fn is_absolute(self) -> bool {
        matches!(self, ExpireMode::ExAt | ExpireMode::PxAt)
    }

    /// Whether the literal is in seconds.
    pub const fn is_seconds(self) -> bool {
        matches!(self, ExpireMode::Ex | ExpireMode::ExAt)
    }
}

/// Result of a successful parse: which options were present plus their raw
/// value tokens.
#[derive(Debug, Clone, Default)]
pub struct ParsedOptions {
    present: OptionSet,
    expire: Option<(ExpireMode, Bytes)>,
    version: Option<Bytes>,
    flags: Option<Bytes>,
    default: Option<Bytes>,
    min: Option<Bytes>,
    max: Option<Bytes>,
}

impl ParsedOptions {
    /// All options seen.
    pub fn present(&self) -> OptionSet {
        self.present
    }

    /// Check if any of the given options was seen.
    pub fn has(&self, options: OptionSet) -> bool {
        self.present.intersects(options)
    }

    /// Expiration mode and its raw literal.
    pub fn expire(&self) -> Option<(ExpireMode, &Bytes)> {
        self.expire.as_ref().map(|(mode, raw)| (*mode, raw))
    }

    /// Raw `VER`/`ABS` literal.
    pub fn version(&self) -> Option<&Bytes> {
        self.version.as_ref()
    }

    /// Raw `FLAGS` literal.
    pub fn flags(&self) -> Option<&Bytes> {
        self.flags.as_ref()
    }

    /// Raw `DEF` literal.
    pub fn default_value(&self) -> Option<&Bytes> {
        self.default.as_ref()
    }

    /// Raw `MIN` literal.
    pub fn min(&self) -> Option<&Bytes> {
        self.min.as_ref()
    }

    /// Raw `MAX` literal.
    pub fn max(&self) -> Option<&Bytes> {
        self.max.as_ref()
    }

    fn record(&mut self, kind: OptionKind, value: Option<Bytes>) {
        self.present |= kind.flag();
        let Some(value) = value else {
            return;
        };
        if let Some(mode) = ExpireMode::from_kind(kind) {
            self.expire = Some((mode, value));
            return;
        }
        match kind {
            OptionKind::Ver | OptionKind::Abs => self.version = Some(value),
            OptionKind::Flags => self.flags = Some(value),
            OptionKind::Def => self.default = Some(value),
            OptionKind::Min => self.min = Some(value),
            OptionKind::Max => self.max = Some(value),
            _ => {}
        }
    }
}

/// Parse trailing option tokens against a command's allow-list.
pub fn parse(tokens: &[Bytes], allowed: OptionSet) -> ExStringResult<ParsedOptions> {
    let mut parsed = ParsedOptions::default();
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        let kind = OptionKind::from_token(token).ok_or(ExStringError::Syntax)?;

        if !allowed.contains(kind.flag()) {
            return Err(ExStringError::Syntax);
        }
        if parsed.present.intersects(kind.conflicts()) {
            return Err(ExStringError::Syntax);
        }

        let value = if kind.takes_value() {
            Some(iter.next().ok_or(ExStringError::Syntax)?.clone())
        } else {
            None
        };
        parsed.record(kind, value);
    }

    Ok(parsed)
}
