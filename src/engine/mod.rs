//! The versioned string engine.
//!
//! - [`value`] - The stored value and its type descriptor
//! - [`options`] - Option keyword grammar shared by every command
//! - [`args`] - Typed per-command arguments
//! - [`expire`] - Expiration resolution
//! - [`numeric`] - Strict number parsing and rendering
//! - [`replication`] - Canonical replication records
//! - [`ops`] - The operations themselves

pub mod args;
pub mod expire;
pub mod numeric;
pub mod ops;
pub mod options;
pub mod replication;
pub mod value;

pub use ops::{CadOutcome, CasOutcome, Engine, FloatOutcome, IncrOutcome, Side};
pub use replication::ReplicationRecord;
pub use value::{TypeDescriptor, VersionedValue};
