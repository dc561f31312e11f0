//! Error types and their client-facing mapping.
//!
//! Every failure the engine can report is an [`ExStringError`]. Client
//! messages are part of the command contract: client libraries match on them,
//! so the strings below are stable.

use thiserror::Error;

/// Errors raised by the option parser, argument validation, the engine, and
/// the persistence codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExStringError {
    /// Malformed, duplicate, or disallowed option token, or a malformed
    /// expiration/version/flags literal.
    #[error("syntax error")]
    Syntax,

    /// The key is bound to a value of another kind.
    #[error("Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The stored value, increment, or default is not a base-10 integer.
    #[error("value is not an integer")]
    NotAnInteger,

    /// The stored value or increment is not a float literal.
    #[error("value is not a float")]
    NotAFloat,

    /// The version argument of a compare-and-swap is not an integer.
    #[error("version should be integer")]
    VersionNotInteger,

    /// A version check did not match the bound value's version.
    #[error("update version is stale")]
    StaleVersion,

    /// Integer overflow, float NaN/Inf, or a MIN/MAX bound violation.
    #[error("increment or decrement would overflow")]
    Overflow,

    /// MIN or MAX is not numeric, or MIN > MAX.
    #[error("min or max is specified, but not valid")]
    InvalidBounds,

    /// The value buffer could not be grown.
    #[error("append buffer failed")]
    AppendFailure,

    /// A persisted triple carries an unknown encoding version.
    #[error("unsupported encoding version {version}")]
    UnsupportedEncoding { version: u32 },

    /// A persisted triple could not be decoded.
    #[error("codec error: {message}")]
    Codec { message: String },
}

impl ExStringError {
    /// Create a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Check if this error only arises from persistence paths.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::UnsupportedEncoding { .. } | Self::Codec { .. })
    }
}

/// Result type using ExStringError.
pub type ExStringResult<T> = Result<T, ExStringError>;

/// Redis RESP error mapping.
pub struct RedisErrorMapping;

impl RedisErrorMapping {
    /// Map an error to its Redis error prefix.
    pub fn to_error_prefix(error: &ExStringError) -> &'static str {
        match error {
            ExStringError::WrongType => "WRONGTYPE",
            _ => "ERR",
        }
    }

    /// Message that follows the prefix on the wire.
    pub fn to_error_message(error: &ExStringError) -> String {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_messages() {
        let cases = [
            (ExStringError::Syntax, "ERR syntax error"),
            (ExStringError::StaleVersion, "ERR update version is stale"),
            (ExStringError::NotAnInteger, "ERR value is not an integer"),
            (ExStringError::NotAFloat, "ERR value is not a float"),
            (
                ExStringError::Overflow,
                "ERR increment or decrement would overflow",
            ),
            (
                ExStringError::InvalidBounds,
                "ERR min or max is specified, but not valid",
            ),
            (
                ExStringError::VersionNotInteger,
                "ERR version should be integer",
            ),
            (ExStringError::AppendFailure, "ERR append buffer failed"),
        ];

        for (error, expected) in cases {
            let rendered = format!(
                "{} {}",
                RedisErrorMapping::to_error_prefix(&error),
                RedisErrorMapping::to_error_message(&error)
            );
            assert_eq!(rendered, expected);
        }
    }

    #[test]
    fn test_wrong_type_prefix() {
        assert_eq!(
            RedisErrorMapping::to_error_prefix(&ExStringError::WrongType),
            "WRONGTYPE"
        );
    }

    #[test]
    fn test_persistence_classification() {
        assert!(ExStringError::UnsupportedEncoding { version: 7 }.is_persistence());
        assert!(ExStringError::codec("truncated").is_persistence());
        assert!(!ExStringError::Overflow.is_persistence());
    }
}
