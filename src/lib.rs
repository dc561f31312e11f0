//! exstring - versioned string values for Redis-style key-value hosts.
//!
//! Every value carries a 64-bit version, bumped on each successful write,
//! and an opaque 32-bit flags word. Writes can be made conditional on the
//! version (`NX`/`XX` on presence, `VER` on equality, `ABS` to force it),
//! which gives clients optimistic concurrency on a single key.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Redis adapter (RESP2, commands)                 │
//! │     EXSET │ EXGET │ EXINCRBY │ EXCAS │ EXCAD │ EXAPPEND │ ...    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                             Engine                              │
//! │     option grammar │ version rules │ expiration │ numerics      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Host collaborators                       │
//! │        Keyspace │ Clock │ ReplicationSink │ persistence          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::time`] - Clock abstraction
//! - [`core::error`] - Error types and mapping
//!
//! ## Engine
//! - [`engine::ops`] - The versioned operations
//! - [`engine::options`] - Option keyword grammar
//! - [`engine::replication`] - Canonical replication records
//!
//! ## Host
//! - [`host`] - Keyspace and replication traits
//! - [`host::memory`] - In-memory reference keyspace
//!
//! ## Persistence
//! - [`persist`] - Value encoding, digest, AOF rewrite, snapshots
//!
//! ## Adapters
//! - [`adapters::redis`] - Command handlers, RESP2 codec, AOF
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - A successful write leaves the version strictly greater than before,
//!   except `ABS`, which sets it exactly.
//! - A failed write changes nothing and replicates nothing.
//! - Replication records are deterministic: a replica applying them ends
//!   with the same value, version, flags, and deadline.

// Core infrastructure
pub mod core;

// Versioned string engine
pub mod engine;

// Host collaborators
pub mod host;

// Persistence hooks
pub mod persist;

// Protocol adapters
pub mod adapters;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, time};
pub use adapters::redis;
pub use engine::{Engine, ReplicationRecord, VersionedValue};
pub use host::{Keyspace, MemoryKeyspace, ReplicationSink};
