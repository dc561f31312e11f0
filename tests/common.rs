//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use bytes::Bytes;
use exstring::config::Config;
use exstring::host::{MemoryKeyspace, NullSink, RecordingSink, ReplicationSink};
use exstring::redis::{CommandRouter, CommandState, RedisCommand, RedisValue};
use exstring::time::ManualClock;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Fixed start time for every harness clock.
pub const START_MS: i64 = 1_700_000_000_000;

/// A command router wired to an in-memory keyspace and a manual clock.
pub struct Node {
    pub router: CommandRouter,
    pub state: CommandState,
    pub keyspace: Arc<MemoryKeyspace>,
    pub clock: Arc<ManualClock>,
}

impl Node {
    /// Node whose replication records are discarded.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(NullSink), &Config::default())
    }

    /// Node replicating into `sink`.
    pub fn with_sink(sink: Arc<dyn ReplicationSink>, config: &Config) -> Self {
        let clock = Arc::new(ManualClock::new(START_MS));
        let keyspace = Arc::new(MemoryKeyspace::new(clock.clone()));
        let state = CommandState::new(keyspace.clone(), clock.clone(), sink, config);
        Self {
            router: CommandRouter::new(),
            state,
            keyspace,
            clock,
        }
    }

    /// Node recording its replication stream.
    pub fn recording() -> (Self, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let node = Self::with_sink(sink.clone(), &Config::default());
        (node, sink)
    }

    /// Run a client command given as words.
    pub fn run(&self, parts: &[&str]) -> RedisValue {
        self.router.reply(&command(parts), &self.state)
    }

    /// Apply a command as a replica would.
    pub fn apply(&self, cmd: &RedisCommand) -> RedisValue {
        self.router
            .apply_replicated(cmd, &self.state)
            .unwrap_or_else(RedisValue::Error)
    }
}

/// Build a command from words.
pub fn command(parts: &[&str]) -> RedisCommand {
    let argv = parts
        .iter()
        .map(|p| Bytes::copy_from_slice(p.as_bytes()))
        .collect();
    RedisCommand::from_argv(argv).expect("command has a name")
}

/// Bulk string reply.
pub fn bulk(s: &str) -> RedisValue {
    RedisValue::bulk(Bytes::copy_from_slice(s.as_bytes()))
}

/// Integer reply.
pub fn int(n: i64) -> RedisValue {
    RedisValue::integer(n)
}

/// Plain `ERR` reply.
pub fn err(message: &str) -> RedisValue {
    RedisValue::Error(exstring::redis::RedisError::generic(message))
}

/// Write `content` to a temporary file.
pub fn temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}
