//! RESP2 parser and encoder.
//!
//! Used for the append-only file and for piping commands into the CLI.
//! Supports simple strings (+), errors (-), integers (:), bulk strings ($),
//! arrays (*), null ($-1 / *-1), and inline commands.

use super::{RedisError, RedisValue};
use bytes::Bytes;

/// Maximum nesting depth for arrays.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum bulk string size (512MB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of array elements.
pub const MAX_ELEMENTS: usize = 1_000_000;

/// Parse result.
#[derive(Debug, PartialEq)]
pub enum ParseResult {
    /// Parsed a value; carries the number of bytes consumed.
    Ok(RedisValue, usize),
    /// Need more data.
    Incomplete,
    /// Parse error.
    Error(String),
}

/// RESP2 parser.
#[derive(Debug, Default)]
pub struct Resp2Parser {
    depth: usize,
}

impl Resp2Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one value from the front of `data`.
    pub fn parse(&mut self, data: &[u8]) -> ParseResult {
        self.depth = 0;
        self.parse_value(data)
    }

    fn parse_value(&mut self, data: &[u8]) -> ParseResult {
        let Some(&type_byte) = data.first() else {
            return ParseResult::Incomplete;
        };

        if self.depth > MAX_NESTING_DEPTH {
            return ParseResult::Error("maximum nesting depth exceeded".to_string());
        }

        match type_byte {
            b'+' => parse_line(data, |line| {
                Ok(RedisValue::SimpleString(
                    String::from_utf8_lossy(line).into_owned(),
                ))
            }),
            b'-' => parse_line(data, |line| {
                let s = String::from_utf8_lossy(line);
                let (kind, message) = s.split_once(' ').unwrap_or((s.as_ref(), ""));
                Ok(RedisValue::Error(RedisError::new(kind, message)))
            }),
            b':' => parse_line(data, |line| {
                parse_len(line)
                    .map(RedisValue::Integer)
                    .ok_or_else(|| "invalid integer".to_string())
            }),
            b'$' => self.parse_bulk_string(data),
            b'*' => self.parse_array(data),
            _ => self.parse_inline(data),
        }
    }

    /// Parse a bulk string ($6\r\nfoobar\r\n).
    fn parse_bulk_string(&self, data: &[u8]) -> ParseResult {
        let Some(len_pos) = find_crlf(&data[1..]) else {
            return ParseResult::Incomplete;
        };
        let header = len_pos + 3;
        let len = match parse_len(&data[1..len_pos + 1]) {
            Some(-1) => return ParseResult::Ok(RedisValue::Null, header),
            Some(len) if len >= 0 => len as usize,
            _ => return ParseResult::Error("invalid bulk string length".to_string()),
        };
        if len > MAX_BULK_SIZE {
            return ParseResult::Error(format!(
                "bulk string too large: {} > {}",
                len, MAX_BULK_SIZE
            ));
        }

        let end = header + len;
        if data.len() < end + 2 {
            return ParseResult::Incomplete;
        }
        if &data[end..end + 2] != b"\r\n" {
            return ParseResult::Error("missing CRLF after bulk string".to_string());
        }

        let bytes = Bytes::copy_from_slice(&data[header..end]);
        ParseResult::Ok(RedisValue::BulkString(bytes), end + 2)
    }

    /// Parse an array (*2\r\n...).
    fn parse_array(&mut self, data: &[u8]) -> ParseResult {
        let Some(len_pos) = find_crlf(&data[1..]) else {
            return ParseResult::Incomplete;
        };
        let mut offset = len_pos + 3;
        let len = match parse_len(&data[1..len_pos + 1]) {
            Some(-1) => return ParseResult::Ok(RedisValue::Null, offset),
            Some(len) if len >= 0 => len as usize,
            _ => return ParseResult::Error("invalid array length".to_string()),
        };
        if len > MAX_ELEMENTS {
            return ParseResult::Error(format!("array too large: {} > {}", len, MAX_ELEMENTS));
        }

        self.depth += 1;
        let mut elements = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            match self.parse_value(&data[offset..]) {
                ParseResult::Ok(value, consumed) => {
                    elements.push(value);
                    offset += consumed;
                }
                other => {
                    self.depth -= 1;
                    return other;
                }
            }
        }
        self.depth -= 1;

        ParseResult::Ok(RedisValue::Array(elements), offset)
    }

    /// Parse an inline command (EXGET key\r\n).
    fn parse_inline(&self, data: &[u8]) -> ParseResult {
        let Some(pos) = find_crlf(data) else {
            return ParseResult::Incomplete;
        };

        let elements: Vec<RedisValue> = data[..pos]
            .split(|&b| b == b' ')
            .filter(|p| !p.is_empty())
            .map(|p| RedisValue::BulkString(Bytes::copy_from_slice(p)))
            .collect();

        if elements.is_empty() {
            return ParseResult::Error("empty command".to_string());
        }
        ParseResult::Ok(RedisValue::Array(elements), pos + 2)
    }
}

/// RESP2 encoder.
#[derive(Debug, Default)]
pub struct Resp2Encoder;

impl Resp2Encoder {
    /// Encode a value to bytes.
    pub fn encode(value: &RedisValue) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        Self::encode_into(value, &mut buf);
        buf
    }

    /// Encode a value into a buffer.
    pub fn encode_into(value: &RedisValue, buf: &mut Vec<u8>) {
        match value {
            RedisValue::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::Error(e) => {
                buf.push(b'-');
                buf.extend_from_slice(e.kind.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(e.message.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::BulkString(data) => {
                buf.push(b'$');
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::Array(elements) => {
                buf.push(b'*');
                buf.extend_from_slice(elements.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for elem in elements {
                    Self::encode_into(elem, buf);
                }
            }
            RedisValue::Null => {
                buf.extend_from_slice(b"$-1\r\n");
            }
        }
    }
}

fn parse_line(
    data: &[u8],
    build: impl FnOnce(&[u8]) -> Result<RedisValue, String>,
) -> ParseResult {
    match find_crlf(&data[1..]) {
        Some(pos) => match build(&data[1..pos + 1]) {
            Ok(value) => ParseResult::Ok(value, pos + 3),
            Err(e) => ParseResult::Error(e),
        },
        None => ParseResult::Incomplete,
    }
}

fn parse_len(raw: &[u8]) -> Option<i64> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

/// Find CRLF in data, returning position of first \r.
fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}
