//! Run command implementation.
//!
//! Reads one command per line, `redis-cli` style, executes it against a
//! [`MemoryKeyspace`], and prints each reply.

use crate::adapters::redis::aof::read_commands;
use crate::adapters::redis::protocol::Resp2Encoder;
use crate::adapters::redis::{
    AofWriter, CommandRouter, CommandState, RedisCommand, RedisError, RedisValue,
};
use crate::core::config::{Config, ConfigOverrides};
use crate::core::time::{Clock, SystemClock};
use crate::host::{Keyspace, MemoryKeyspace, NullSink, ReplicationSink};
use crate::persist::KeyspaceSnapshot;
use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Args;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Execute commands against an in-memory keyspace.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command script, one command per line. Reads stdin when omitted.
    pub script: Option<PathBuf>,

    /// Snapshot to load before running and save afterwards.
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Append replication records to this file.
    #[arg(long)]
    pub aof: Option<String>,

    /// Replay an AOF into the keyspace before running.
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Refuse writes once the keyspace uses more than this many bytes.
    #[arg(long)]
    pub max_memory: Option<usize>,

    /// Print replies RESP encoded instead of as text.
    #[arg(long)]
    pub resp: bool,
}

/// Initialize tracing subscriber if the telemetry feature is enabled.
#[cfg(feature = "telemetry")]
fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(not(feature = "telemetry"))]
fn init_tracing(_level: &str) {}

/// Run the run command.
pub fn run_script(args: RunArgs, mut config: Config) -> Result<()> {
    config.apply_overrides(&ConfigOverrides {
        snapshot_path: args.snapshot.clone(),
        aof_path: args.aof.clone(),
        max_memory_bytes: args.max_memory,
        ..Default::default()
    });
    config.validate()?;
    init_tracing(&config.telemetry.log_level);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let keyspace = Arc::new(MemoryKeyspace::new(clock.clone()));
    let router = CommandRouter::new();

    // Loading must not feed the AOF, so it runs against a state without a sink.
    let loader = CommandState::new(keyspace.clone(), clock.clone(), Arc::new(NullSink), &config);

    if let Some(path) = config.paths.snapshot_path.as_deref().map(Path::new) {
        if path.exists() {
            let snapshot = KeyspaceSnapshot::read_from_file(path)?;
            let restored =
                snapshot.restore_into(&keyspace, loader.descriptor(), clock.now())?;
            info!(path = %path.display(), restored, "loaded snapshot");
        }
    }

    if let Some(path) = &args.replay {
        let commands = read_commands(path)?;
        let mut rejected = 0;
        for cmd in &commands {
            if let Err(e) = router.apply_replicated(cmd, &loader) {
                warn!(command = %cmd.name, error = %e, "replayed command failed");
                rejected += 1;
            }
        }
        info!(path = %path.display(), commands = commands.len(), rejected, "replayed AOF");
    }

    let aof = match &config.replication.aof_path {
        Some(path) if config.replication.enabled => {
            Some(Arc::new(AofWriter::open(Path::new(path))?))
        }
        _ => None,
    };
    let sink: Arc<dyn ReplicationSink> = match &aof {
        Some(writer) => writer.clone(),
        None => Arc::new(NullSink),
    };
    let state = CommandState::new(keyspace.clone(), clock.clone(), sink, &config);

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("failed to open script: {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in input.lines() {
        let line = line.context("failed to read command input")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let reply = match split_args(line) {
            Ok(argv) => match RedisCommand::from_argv(argv) {
                Ok(cmd) => router.reply(&cmd, &state),
                Err(e) => RedisValue::Error(e),
            },
            Err(message) => RedisValue::Error(RedisError::generic(message)),
        };

        if args.resp {
            out.write_all(&Resp2Encoder::encode(&reply))?;
        } else {
            writeln!(out, "{}", reply.render())?;
        }
    }
    out.flush()?;

    info!(
        processed = state.stats().processed(),
        failed = state.stats().failed(),
        keys = keyspace.len(),
        used_memory = keyspace.used_memory(),
        "script finished"
    );
    if let Some(writer) = &aof {
        let failed = writer.failed_appends();
        if failed > 0 {
            warn!(path = %writer.path().display(), failed, "AOF is missing records");
        }
    }

    if let Some(path) = config.paths.snapshot_path.as_deref().map(Path::new) {
        let snapshot = KeyspaceSnapshot::capture(&keyspace, state.descriptor(), clock.now());
        snapshot.write_to_file(path)?;
        info!(path = %path.display(), keys = snapshot.entries.len(), "saved snapshot");
    }

    Ok(())
}

/// Split a command line into arguments.
///
/// Arguments are separated by whitespace. Double quotes allow spaces and the
/// escapes `\n`, `\r`, `\t`, `\\`, `\"`, and `\xHH`; single quotes are taken
/// literally.
fn split_args(line: &str) -> Result<Vec<Bytes>, String> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut current = Vec::new();
        if first == '"' || first == '\'' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == first {
                    closed = true;
                    break;
                }
                if c == '\\' && first == '"' {
                    let escaped = chars.next().ok_or("unbalanced quotes")?;
                    match escaped {
                        'n' => current.push(b'\n'),
                        'r' => current.push(b'\r'),
                        't' => current.push(b'\t'),
                        'x' => {
                            let hex: String = [chars.next(), chars.next()]
                                .into_iter()
                                .flatten()
                                .collect();
                            let byte = u8::from_str_radix(&hex, 16)
                                .ok()
                                .filter(|_| hex.len() == 2)
                                .ok_or("invalid \\x escape")?;
                            current.push(byte);
                        }
                        other => push_char(&mut current, other),
                    }
                } else {
                    push_char(&mut current, c);
                }
            }
            if !closed {
                return Err("unbalanced quotes".to_string());
            }
            if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                return Err("closing quote must be followed by a space".to_string());
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                push_char(&mut current, c);
            }
        }
        args.push(Bytes::from(current));
    }

    Ok(args)
}

fn push_char(buf: &mut Vec<u8>, c: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
}
