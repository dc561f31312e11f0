//! Protocol adapters.
//!
//! Adapters translate a wire protocol into engine operations. Only the
//! Redis adapter exists: it parses argument vectors, dispatches them to
//! command handlers, and shapes engine outcomes into RESP replies.

pub mod redis;
