//! Command handlers.
//!
//! Every command implements [`CommandHandler`]. The [`CommandRouter`] looks
//! handlers up by uppercase name, checks arity and memory admission, and
//! runs them one at a time under the state's execution lock, the way a
//! single-threaded host event loop would.
//!
//! | Command | Arity | Flags |
//! |---------|-------|-------|
//! | EXSET, EXINCRBY, EXINCRBYFLOAT, EXAPPEND, EXPREPEND | -3 | write deny-oom |
//! | EXCAS, EXGAE | -4 | write deny-oom |
//! | EXSETVER, EXCAD | 3 | write deny-oom |
//! | EXGET | -2 | readonly fast |

pub mod exstring;

use crate::adapters::redis::{RedisCommand, RedisError, RedisValue};
use crate::core::config::Config;
use crate::core::time::Clock;
use crate::engine::{Engine, TypeDescriptor};
use crate::host::{Keyspace, ReplicationSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of command execution.
pub type CommandResult = Result<RedisValue, RedisError>;

/// Keys a command touches, as (first, last, step) argv positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    pub first: usize,
    pub last: usize,
    pub step: usize,
}

impl KeySpec {
    /// A single key right after the command name.
    pub const SINGLE: KeySpec = KeySpec {
        first: 1,
        last: 1,
        step: 1,
    };
}

/// Command handler trait.
pub trait CommandHandler: Send + Sync {
    /// Execute the command. Arity has already been checked.
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult;

    /// Get the command name.
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required.
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited).
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// Whether this command is a write operation.
    fn is_write(&self) -> bool {
        false
    }

    /// Whether this command is refused while memory is over the limit.
    fn deny_oom(&self) -> bool {
        self.is_write()
    }

    /// Key positions in the argv.
    fn key_spec(&self) -> KeySpec {
        KeySpec::SINGLE
    }
}

/// Static description of a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    /// Redis-style arity: argv length including the name, negative for
    /// "at least".
    pub arity: i64,
    pub flags: Vec<&'static str>,
    pub keys: KeySpec,
}

impl CommandInfo {
    fn of(handler: &dyn CommandHandler) -> Self {
        let argv_min = handler.min_args() as i64 + 1;
        let arity = match handler.max_args() {
            Some(max) if max == handler.min_args() => argv_min,
            _ => -argv_min,
        };

        let flags = if handler.is_write() {
            let mut flags = vec!["write"];
            if handler.deny_oom() {
                flags.push("deny-oom");
            }
            flags
        } else {
            vec!["readonly", "fast"]
        };

        Self {
            name: handler.name(),
            arity,
            flags,
            keys: handler.key_spec(),
        }
    }
}

/// Execution counters.
#[derive(Debug, Default)]
pub struct CommandStats {
    processed: AtomicU64,
    failed: AtomicU64,
    rejected_oom: AtomicU64,
}

impl CommandStats {
    /// Commands dispatched, including failed ones.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Commands that replied with an error.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Writes refused by memory admission.
    pub fn rejected_oom(&self) -> u64 {
        self.rejected_oom.load(Ordering::Relaxed)
    }
}

/// Shared state for command execution.
pub struct CommandState {
    keyspace: Arc<dyn Keyspace>,
    clock: Arc<dyn Clock>,
    replication: Arc<dyn ReplicationSink>,
    descriptor: TypeDescriptor,
    max_value_bytes: usize,
    max_memory_bytes: usize,
    exec_lock: Mutex<()>,
    stats: CommandStats,
}

impl CommandState {
    /// Create new command state.
    pub fn new(
        keyspace: Arc<dyn Keyspace>,
        clock: Arc<dyn Clock>,
        replication: Arc<dyn ReplicationSink>,
        config: &Config,
    ) -> Self {
        Self {
            keyspace,
            clock,
            replication,
            descriptor: TypeDescriptor::exstring(),
            max_value_bytes: config.engine.max_value_bytes,
            max_memory_bytes: config.memory.max_memory_bytes,
            exec_lock: Mutex::new(()),
            stats: CommandStats::default(),
        }
    }

    /// Engine bound to this state's collaborators.
    pub fn engine(&self) -> Engine<'_> {
        Engine::new(
            self.keyspace.as_ref(),
            self.clock.as_ref(),
            self.replication.as_ref(),
            self.max_value_bytes,
        )
    }

    /// Get the keyspace.
    pub fn keyspace(&self) -> &Arc<dyn Keyspace> {
        &self.keyspace
    }

    /// Registered value type.
    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// Get execution counters.
    pub fn stats(&self) -> &CommandStats {
        &self.stats
    }

    fn over_memory_limit(&self) -> bool {
        self.max_memory_bytes > 0 && self.keyspace.used_memory() > self.max_memory_bytes
    }
}

/// Command router.
pub struct CommandRouter {
    /// Registered handlers.
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRouter {
    /// Create a new command router with all handlers registered.
    pub fn new() -> Self {
        let mut router = Self {
            handlers: HashMap::new(),
        };

        router.register_all();

        router
    }

    fn register_all(&mut self) {
        self.register(Arc::new(exstring::ExSetHandler));
        self.register(Arc::new(exstring::ExGetHandler));
        self.register(Arc::new(exstring::ExIncrByHandler));
        self.register(Arc::new(exstring::ExIncrByFloatHandler));
        self.register(Arc::new(exstring::ExSetVerHandler));
        self.register(Arc::new(exstring::ExCasHandler));
        self.register(Arc::new(exstring::ExCadHandler));
        self.register(Arc::new(exstring::ExAppendHandler));
        self.register(Arc::new(exstring::ExPrependHandler));
        self.register(Arc::new(exstring::ExGaeHandler));
    }

    /// Register a command handler.
    fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.name().to_uppercase(), handler);
    }

    /// Get a handler for a command.
    pub fn get(&self, command: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(&command.to_uppercase())
    }

    /// Execute a client command.
    pub fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        self.dispatch(cmd, state, true)
    }

    /// Execute a client command, folding errors into the reply.
    pub fn reply(&self, cmd: &RedisCommand, state: &CommandState) -> RedisValue {
        self.execute(cmd, state).unwrap_or_else(RedisValue::Error)
    }

    /// Apply a command received from a primary or read from the AOF.
    ///
    /// Replicated writes bypass memory admission. `DEL` is a host command
    /// and goes straight to the keyspace.
    pub fn apply_replicated(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        if cmd.name == "DEL" {
            if cmd.argc() == 0 {
                return Err(RedisError::wrong_arity(&cmd.name));
            }
            let _guard = state.exec_lock.lock();
            let removed = cmd
                .args
                .iter()
                .filter(|key| state.keyspace.delete(key))
                .count();
            return Ok(RedisValue::integer(removed as i64));
        }
        self.dispatch(cmd, state, false)
    }

    fn dispatch(&self, cmd: &RedisCommand, state: &CommandState, admit: bool) -> CommandResult {
        let result = self.run(cmd, state, admit);

        state.stats.processed.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = &result {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            debug!(command = %cmd.name, error = %e, "command failed");
        }
        result
    }

    fn run(&self, cmd: &RedisCommand, state: &CommandState, admit: bool) -> CommandResult {
        let handler = self
            .get(&cmd.name)
            .ok_or_else(|| RedisError::unknown_command(&cmd.name, &cmd.args))?;

        if cmd.argc() < handler.min_args() {
            return Err(RedisError::wrong_arity(&cmd.name));
        }
        if let Some(max) = handler.max_args() {
            if cmd.argc() > max {
                return Err(RedisError::wrong_arity(&cmd.name));
            }
        }

        if admit && handler.deny_oom() && state.over_memory_limit() {
            state.stats.rejected_oom.fetch_add(1, Ordering::Relaxed);
            warn!(
                command = %cmd.name,
                used = state.keyspace.used_memory(),
                limit = state.max_memory_bytes,
                "write refused over memory limit"
            );
            return Err(RedisError::oom());
        }

        let _guard = state.exec_lock.lock();
        handler.execute(cmd, state)
    }

    /// Describe a registered command.
    pub fn info(&self, command: &str) -> Option<CommandInfo> {
        self.get(command).map(|h| CommandInfo::of(h.as_ref()))
    }

    /// Get all registered command names.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}
