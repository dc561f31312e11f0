//! Configuration loading and command router surface.

mod common;

use common::{err, temp_file, Node};
use exstring::config::{Config, ConfigOverrides};
use exstring::redis::{CommandRouter, RedisError, RedisValue};
use exstring::host::{MemoryKeyspace, NullSink};
use exstring::redis::CommandState;
use exstring::time::ManualClock;
use std::sync::Arc;

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn config_from_file() {
    let file = temp_file(
        r#"
[engine]
max_value_bytes = 64

[memory]
max_memory_bytes = 4096

[replication]
aof_path = "/tmp/exstring.aof"

[telemetry]
log_level = "debug"
"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.engine.max_value_bytes, 64);
    assert_eq!(config.memory.max_memory_bytes, 4096);
    assert!(config.replication.enabled);
    assert_eq!(config.replication.aof_path.as_deref(), Some("/tmp/exstring.aof"));
    assert_eq!(config.telemetry.log_level, "debug");
    assert!(config.paths.snapshot_path.is_none());
}

#[test]
fn config_rejects_bad_level() {
    let file = temp_file("[telemetry]\nlog_level = \"loud\"\n");
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn config_missing_file() {
    assert!(Config::from_file(std::path::Path::new("/nonexistent/exstring.toml")).is_err());
}

#[test]
fn overrides_win_over_file() {
    let file = temp_file("[memory]\nmax_memory_bytes = 10\n");
    let mut config = Config::from_file(file.path()).unwrap();
    config.apply_overrides(&ConfigOverrides {
        max_memory_bytes: Some(0),
        log_level: Some("warn".to_string()),
        ..Default::default()
    });
    assert_eq!(config.memory.max_memory_bytes, 0);
    assert_eq!(config.telemetry.log_level, "warn");
}

// ============================================================================
// Router
// ============================================================================

#[test]
fn router_lists_commands() {
    let router = CommandRouter::new();
    assert_eq!(
        router.commands(),
        vec![
            "EXAPPEND",
            "EXCAD",
            "EXCAS",
            "EXGAE",
            "EXGET",
            "EXINCRBY",
            "EXINCRBYFLOAT",
            "EXPREPEND",
            "EXSET",
            "EXSETVER",
        ]
    );
}

#[test]
fn value_limit_from_config() {
    let clock = Arc::new(ManualClock::new(common::START_MS));
    let keyspace = Arc::new(MemoryKeyspace::new(clock.clone()));
    let mut config = Config::default();
    config.engine.max_value_bytes = 4;
    let state = CommandState::new(keyspace, clock, Arc::new(NullSink), &config);
    let router = CommandRouter::new();

    let run = |parts: &[&str]| router.reply(&common::command(parts), &state);
    run(&["EXSET", "k", "abc"]);
    assert_eq!(run(&["EXAPPEND", "k", "d"]), RedisValue::integer(2));
    assert_eq!(run(&["EXAPPEND", "k", "e"]), err("append buffer failed"));
}

#[test]
fn memory_limit_refuses_writes() {
    let mut config = Config::default();
    config.memory.max_memory_bytes = 1;
    let node = Node::with_sink(Arc::new(NullSink), &config);

    assert_eq!(node.run(&["EXSET", "k", "v"]), RedisValue::ok());
    assert_eq!(node.run(&["EXSET", "j", "v"]), RedisValue::Error(RedisError::oom()));
    assert!(!node.run(&["EXGET", "k"]).is_null());
    assert_eq!(node.state.stats().rejected_oom(), 1);
}

#[test]
fn unknown_and_arity_errors() {
    let node = Node::new();
    assert!(node.run(&["NOPE", "a"]).render().contains("unknown command"));
    assert_eq!(
        node.run(&["EXGET"]),
        err("wrong number of arguments for 'exget' command")
    );
    assert_eq!(node.state.stats().failed(), 2);
}
