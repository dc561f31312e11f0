//! Time sources for expiration arithmetic.
//!
//! The engine never samples the wall clock directly. Every command reads the
//! current time exactly once from a [`Clock`] handed in by the host, and uses
//! that single sample both to convert absolute deadlines into relative
//! durations and to build the absolute deadline it replicates.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// A point in time expressed as milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixMillis(pub i64);

impl UnixMillis {
    /// Create a new instant from raw milliseconds.
    pub const fn new(ms: i64) -> Self {
        Self(ms)
    }

    /// Raw millisecond value.
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Add a relative duration, saturating at the representable range.
    pub const fn add_ms(self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds from `self` until `deadline`.
    ///
    /// Returns 0 if the deadline has already passed.
    pub fn ms_until(self, deadline: UnixMillis) -> i64 {
        deadline.0.saturating_sub(self.0).max(0)
    }

    /// Check if this instant is at or after the given deadline.
    pub const fn is_at_or_after(self, deadline: UnixMillis) -> bool {
        self.0 >= deadline.0
    }
}

impl std::fmt::Display for UnixMillis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of "now" for expiration arithmetic.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now(&self) -> UnixMillis;
}

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixMillis {
        let ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        UnixMillis(i64::try_from(ms).unwrap_or(i64::MAX))
    }
}

/// Manually driven clock.
///
/// Used by tests and by replay tooling that must reproduce a recorded
/// timeline.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start_ms`.
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    /// Move the clock forward by `ms` milliseconds.
    pub fn advance(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::AcqRel);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixMillis {
        UnixMillis(self.now_ms.load(Ordering::Acquire))
    }
}
