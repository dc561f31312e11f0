//! Versioned string command handlers.
//!
//! Implements EXSET, EXGET, EXINCRBY, EXINCRBYFLOAT, EXSETVER, EXCAS, EXCAD,
//! EXAPPEND, EXPREPEND, and EXGAE. Handlers turn argv into typed arguments,
//! call the engine, and shape the reply. All argument validation happens
//! before the key is looked up.

use super::{CommandHandler, CommandResult, CommandState};
use crate::adapters::redis::{RedisCommand, RedisError, RedisValue};
use crate::engine::args::{
    parse_cad_version, parse_set_version, AppendArgs, CasArgs, GaeArgs, IncrByArgs,
    IncrByFloatArgs, SetArgs,
};
use crate::engine::{CasOutcome, Side, VersionedValue};
use bytes::Bytes;

fn version_reply(version: u64) -> RedisValue {
    RedisValue::integer(i64::try_from(version).unwrap_or(i64::MAX))
}

/// `[value, version, flags]`
fn full_reply(value: VersionedValue) -> RedisValue {
    RedisValue::array(vec![
        RedisValue::BulkString(value.value),
        version_reply(value.version),
        RedisValue::integer(i64::from(value.flags)),
    ])
}

/// EXSET command handler.
pub struct ExSetHandler;

impl CommandHandler for ExSetHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let value = cmd.require_arg(1)?.clone();
        let args = SetArgs::parse(value, cmd.args_from(2))?;
        let with_version = args.with_version;

        Ok(match state.engine().set(key, args)? {
            None => RedisValue::Null,
            Some(version) if with_version => version_reply(version),
            Some(_) => RedisValue::ok(),
        })
    }

    fn name(&self) -> &'static str {
        "EXSET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXGET command handler.
pub struct ExGetHandler;

impl CommandHandler for ExGetHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let with_flags = match cmd.arg(1) {
            None => false,
            Some(opt) if opt.eq_ignore_ascii_case(b"WITHFLAGS") => true,
            Some(_) => return Err(RedisError::syntax()),
        };

        let Some(value) = state.engine().get(key)? else {
            return Ok(RedisValue::Null);
        };
        if with_flags {
            return Ok(full_reply(value));
        }
        Ok(RedisValue::array(vec![
            RedisValue::BulkString(value.value),
            version_reply(value.version),
        ]))
    }

    fn name(&self) -> &'static str {
        "EXGET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
}

/// EXINCRBY command handler.
pub struct ExIncrByHandler;

impl CommandHandler for ExIncrByHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let args = IncrByArgs::parse(cmd.require_arg(1)?, cmd.args_from(2))?;
        let with_version = args.with_version;

        Ok(match state.engine().incr_by(key, args)? {
            None => RedisValue::Null,
            Some(out) if with_version => RedisValue::array(vec![
                RedisValue::integer(out.value),
                version_reply(out.version),
            ]),
            Some(out) => RedisValue::integer(out.value),
        })
    }

    fn name(&self) -> &'static str {
        "EXINCRBY"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXINCRBYFLOAT command handler.
pub struct ExIncrByFloatHandler;

impl CommandHandler for ExIncrByFloatHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let args = IncrByFloatArgs::parse(cmd.require_arg(1)?, cmd.args_from(2))?;

        Ok(match state.engine().incr_by_float(key, args)? {
            None => RedisValue::Null,
            Some(out) => RedisValue::BulkString(out.value),
        })
    }

    fn name(&self) -> &'static str {
        "EXINCRBYFLOAT"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXSETVER command handler.
pub struct ExSetVerHandler;

impl CommandHandler for ExSetVerHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let version = parse_set_version(cmd.require_arg(1)?)?;

        let updated = state.engine().set_version(key, version)?;
        Ok(RedisValue::integer(i64::from(updated)))
    }

    fn name(&self) -> &'static str {
        "EXSETVER"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXCAS command handler.
pub struct ExCasHandler;

impl CommandHandler for ExCasHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let value = cmd.require_arg(1)?.clone();
        let args = CasArgs::parse(value, cmd.require_arg(2)?, cmd.args_from(3))?;

        Ok(match state.engine().compare_and_swap(key, args)? {
            CasOutcome::Missing => RedisValue::integer(-1),
            CasOutcome::Mismatch(current) => RedisValue::array(vec![
                RedisValue::simple_string("CAS_FAILED"),
                RedisValue::BulkString(current.value),
                version_reply(current.version),
            ]),
            CasOutcome::Swapped { version } => RedisValue::array(vec![
                RedisValue::ok(),
                RedisValue::BulkString(Bytes::new()),
                version_reply(version),
            ]),
        })
    }

    fn name(&self) -> &'static str {
        "EXCAS"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXCAD command handler.
pub struct ExCadHandler;

impl CommandHandler for ExCadHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let version = parse_cad_version(cmd.require_arg(1)?)?;

        let outcome = state.engine().compare_and_delete(key, version)?;
        Ok(RedisValue::integer(outcome.code()))
    }

    fn name(&self) -> &'static str {
        "EXCAD"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(2)
    }

    fn is_write(&self) -> bool {
        true
    }
}

fn concat(cmd: &RedisCommand, state: &CommandState, side: Side) -> CommandResult {
    let key = cmd.require_arg(0)?;
    let bytes = cmd.require_arg(1)?.clone();
    let args = AppendArgs::parse(bytes, cmd.args_from(2))?;

    Ok(match state.engine().concat(key, args, side)? {
        None => RedisValue::Null,
        Some(version) => version_reply(version),
    })
}

/// EXAPPEND command handler.
pub struct ExAppendHandler;

impl CommandHandler for ExAppendHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        concat(cmd, state, Side::Tail)
    }

    fn name(&self) -> &'static str {
        "EXAPPEND"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXPREPEND command handler.
pub struct ExPrependHandler;

impl CommandHandler for ExPrependHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        concat(cmd, state, Side::Head)
    }

    fn name(&self) -> &'static str {
        "EXPREPEND"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXGAE command handler.
pub struct ExGaeHandler;

impl CommandHandler for ExGaeHandler {
    fn execute(&self, cmd: &RedisCommand, state: &CommandState) -> CommandResult {
        let key = cmd.require_arg(0)?;
        let args = GaeArgs::parse(cmd.args_from(1))?;

        Ok(match state.engine().get_and_expire(key, args)? {
            None => RedisValue::Null,
            Some(value) => full_reply(value),
        })
    }

    fn name(&self) -> &'static str {
        "EXGAE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn is_write(&self) -> bool {
        true
    }
}
