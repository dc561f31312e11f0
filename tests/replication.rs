//! Replica equivalence: a node fed the primary's records ends up identical.

mod common;

use common::{command, int, Node, START_MS};
use exstring::engine::TypeDescriptor;
use exstring::persist::KeyspaceSnapshot;
use exstring::redis::{RedisCommand, RedisValue};
use exstring::time::UnixMillis;

fn replay(primary_records: &[exstring::ReplicationRecord]) -> Node {
    let replica = Node::new();
    for record in primary_records {
        let reply = replica.apply(&RedisCommand::from(record));
        assert!(!reply.is_error(), "{} replied {}", record, reply.render());
    }
    replica
}

fn capture(node: &Node) -> KeyspaceSnapshot {
    KeyspaceSnapshot::capture(
        &node.keyspace,
        node.state.descriptor(),
        UnixMillis::new(START_MS),
    )
}

// ============================================================================
// Equivalence
// ============================================================================

#[test]
fn replica_matches_primary() {
    let (primary, sink) = Node::recording();
    let script: &[&[&str]] = &[
        &["EXSET", "a", "1", "FLAGS", "5", "EX", "100"],
        &["EXINCRBY", "a", "41", "KEEPTTL"],
        &["EXINCRBYFLOAT", "f", "2.25", "PX", "9000"],
        &["EXAPPEND", "s", "tail"],
        &["EXPREPEND", "s", "head-"],
        &["EXSET", "v", "x", "ABS", "40"],
        &["EXSETVER", "v", "77"],
        &["EXCAS", "v", "y", "77", "EXAT", "1800000000"],
        &["EXSET", "gone", "bye"],
        &["EXCAD", "gone", "1"],
        &["EXSET", "t", "ttl"],
        &["EXGAE", "t", "PX", "1234"],
    ];
    for step in script {
        assert!(!primary.run(step).is_error(), "{:?} failed", step);
    }

    let replica = replay(&sink.records());

    let expected = capture(&primary);
    let actual = capture(&replica);
    assert_eq!(actual, expected);
    assert_eq!(
        actual.digest(TypeDescriptor::exstring()).unwrap(),
        expected.digest(TypeDescriptor::exstring()).unwrap()
    );
    assert_eq!(expected.entries.len(), 5);
}

#[test]
fn failed_writes_replicate_nothing() {
    let (primary, sink) = Node::recording();
    primary.run(&["EXSET", "k", "a"]);
    sink.drain();

    primary.run(&["EXSET", "k", "b", "VER", "9"]);
    primary.run(&["EXSET", "k", "b", "NX"]);
    primary.run(&["EXINCRBY", "k", "1"]);
    primary.run(&["EXCAS", "k", "b", "9"]);
    primary.run(&["EXCAD", "k", "9"]);
    primary.run(&["EXGET", "k"]);

    assert!(sink.is_empty());
}

#[test]
fn relative_expiry_replicates_as_absolute() {
    let (primary, sink) = Node::recording();
    primary.run(&["EXSET", "k", "v", "EX", "10"]);

    let record = sink.records().pop().unwrap();
    assert_eq!(
        record.to_string(),
        format!("EXSET k v ABS 1 PXAT {}", START_MS + 10_000)
    );

    // A replica that applies the record late still expires at the same instant.
    let replica = Node::new();
    replica.clock.advance(5_000);
    replica.apply(&RedisCommand::from(&record));
    replica.clock.advance(4_999);
    assert!(!replica.run(&["EXGET", "k"]).is_null());
    replica.clock.advance(1);
    assert!(replica.run(&["EXGET", "k"]).is_null());
}

// ============================================================================
// Replay path
// ============================================================================

#[test]
fn replicated_del_goes_to_keyspace() {
    let node = Node::new();
    node.run(&["EXSET", "a", "1"]);
    node.run(&["EXSET", "b", "2"]);
    assert_eq!(node.apply(&command(&["DEL", "a", "b", "c"])), int(2));
    assert_eq!(node.run(&["EXGET", "a"]), RedisValue::Null);
}

#[test]
fn client_cannot_send_del() {
    let node = Node::new();
    assert!(node.run(&["DEL", "a"]).is_error());
}
