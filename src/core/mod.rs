//! Core infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`time`] - Clock abstraction used for expiration arithmetic
//! - [`error`] - Error types and client-facing error mapping

pub mod config;
pub mod error;
pub mod time;
