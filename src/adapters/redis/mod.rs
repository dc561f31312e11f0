//! Redis command surface for the versioned string type.
//!
//! Commands arrive as argv vectors (a name and binary arguments), are
//! dispatched through the [`CommandRouter`], and produce RESP values.
//!
//! ```text
//! RESP array / script line
//!     ↓
//! RedisCommand (uppercase name, Bytes args)
//!     ↓
//! CommandRouter (arity, deny-oom admission)
//!     ↓
//! exstring handlers → engine::Engine
//!     ↓
//! RedisValue reply + ReplicationRecord → ReplicationSink (AOF)
//! ```

pub mod aof;
pub mod commands;
pub mod protocol;

use crate::core::error::{ExStringError, RedisErrorMapping};
use crate::engine::replication::ReplicationRecord;
use bytes::Bytes;

pub use aof::AofWriter;
pub use commands::{CommandRouter, CommandState};

/// Reply value (the RESP2 type system).
#[derive(Debug, Clone, PartialEq)]
pub enum RedisValue {
    /// Simple string (+OK\r\n)
    SimpleString(String),

    /// Error (-ERR message\r\n)
    Error(RedisError),

    /// Integer (:1000\r\n)
    Integer(i64),

    /// Bulk string ($6\r\nfoobar\r\n)
    BulkString(Bytes),

    /// Array (*2\r\n...)
    Array(Vec<RedisValue>),

    /// Null ($-1\r\n)
    Null,
}

impl RedisValue {
    /// Create a simple string.
    pub fn simple_string(s: impl Into<String>) -> Self {
        Self::SimpleString(s.into())
    }

    /// Create an OK response.
    pub fn ok() -> Self {
        Self::SimpleString("OK".to_string())
    }

    /// Create an integer.
    pub fn integer(n: i64) -> Self {
        Self::Integer(n)
    }

    /// Create a bulk string.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Self::BulkString(data.into())
    }

    /// Create an array.
    pub fn array(items: Vec<RedisValue>) -> Self {
        Self::Array(items)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Try to get as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::SimpleString(s) => Some(s.as_bytes()),
            Self::BulkString(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as array.
    pub fn as_array(&self) -> Option<&[RedisValue]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Render the value the way `redis-cli` prints replies.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        match self {
            Self::SimpleString(s) => out.push_str(s),
            Self::Error(e) => {
                out.push_str("(error) ");
                out.push_str(&e.to_string());
            }
            Self::Integer(n) => out.push_str(&format!("(integer) {}", n)),
            Self::BulkString(b) => out.push_str(&format!("\"{}\"", b.escape_ascii())),
            Self::Null => out.push_str("(nil)"),
            Self::Array(items) if items.is_empty() => out.push_str("(empty array)"),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                        out.push_str(&" ".repeat(indent));
                    }
                    let label = format!("{}) ", i + 1);
                    out.push_str(&label);
                    item.render_into(out, indent + label.len());
                }
            }
        }
    }
}

/// Error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisError {
    /// Error kind (ERR, WRONGTYPE, OOM).
    pub kind: String,
    /// Error message.
    pub message: String,
}

impl RedisError {
    /// Create a new error.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new("ERR", message)
    }

    /// Create a syntax error.
    pub fn syntax() -> Self {
        Self::new("ERR", "syntax error")
    }

    /// Create a wrong number of arguments error.
    pub fn wrong_arity(command: &str) -> Self {
        Self::new(
            "ERR",
            format!(
                "wrong number of arguments for '{}' command",
                command.to_lowercase()
            ),
        )
    }

    /// Create an unknown command error.
    pub fn unknown_command(command: &str, args: &[Bytes]) -> Self {
        let preview: Vec<String> = args
            .iter()
            .take(3)
            .map(|a| format!("'{}'", String::from_utf8_lossy(a)))
            .collect();
        Self::new(
            "ERR",
            format!(
                "unknown command '{}', with args beginning with: {}",
                command,
                preview.join(" ")
            ),
        )
    }

    /// Create an OOM error.
    pub fn oom() -> Self {
        Self::new("OOM", "command not allowed when used memory > 'maxmemory'")
    }
}

impl std::fmt::Display for RedisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.message)
    }
}

impl std::error::Error for RedisError {}

impl From<ExStringError> for RedisError {
    fn from(err: ExStringError) -> Self {
        Self::new(
            RedisErrorMapping::to_error_prefix(&err),
            RedisErrorMapping::to_error_message(&err),
        )
    }
}

/// A command: uppercase name plus binary arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisCommand {
    /// Command name (uppercase).
    pub name: String,

    /// Command arguments.
    pub args: Vec<Bytes>,
}

impl RedisCommand {
    /// Create a new command.
    pub fn new(name: impl Into<String>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            args,
        }
    }

    /// Build a command from an argv vector (name first).
    pub fn from_argv(argv: Vec<Bytes>) -> Result<Self, RedisError> {
        let mut argv = argv.into_iter();
        let name = argv.next().ok_or_else(RedisError::syntax)?;
        let name = String::from_utf8(name.to_vec()).map_err(|_| RedisError::syntax())?;
        Ok(Self::new(name, argv.collect()))
    }

    /// Parse from a RESP array.
    pub fn from_array(values: Vec<RedisValue>) -> Result<Self, RedisError> {
        let argv = values
            .into_iter()
            .map(|v| match v {
                RedisValue::BulkString(b) => Ok(b),
                RedisValue::SimpleString(s) => Ok(Bytes::from(s)),
                RedisValue::Integer(n) => Ok(Bytes::from(n.to_string())),
                _ => Err(RedisError::syntax()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_argv(argv)
    }

    /// Name and arguments as RESP bulk strings.
    pub fn to_array(&self) -> RedisValue {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(RedisValue::bulk(self.name.clone()));
        items.extend(self.args.iter().cloned().map(RedisValue::BulkString));
        RedisValue::Array(items)
    }

    /// Get argument as bytes.
    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// Arguments from `index` on.
    pub fn args_from(&self, index: usize) -> &[Bytes] {
        self.args.get(index..).unwrap_or(&[])
    }

    /// Get number of arguments.
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// Get argument `index`, or an arity error naming the command.
    pub fn require_arg(&self, index: usize) -> Result<&Bytes, RedisError> {
        self.args
            .get(index)
            .ok_or_else(|| RedisError::wrong_arity(&self.name))
    }
}

impl From<&ReplicationRecord> for RedisCommand {
    fn from(record: &ReplicationRecord) -> Self {
        Self::new(record.name(), record.args().to_vec())
    }
}
