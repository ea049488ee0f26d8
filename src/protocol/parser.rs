//! Incremental RESP Decoder
//!
//! The parser works over whatever bytes the connection has buffered so far
//! and reports one of three outcomes:
//!
//! - `Ok(Some((value, consumed)))`: one complete value was decoded from the
//!   front of the buffer, using `consumed` bytes
//! - `Ok(None)`: the buffer holds a valid prefix but not yet a whole value
//! - `Err(ParseError)`: the bytes can never form a valid value
//!
//! The caller keeps reading from the socket until the value is complete.
//! If the socket reaches end-of-stream while a value is still incomplete,
//! that is the "missing terminator / truncated payload" error of the
//! protocol and is reported by the connection layer.
//!
//! Framing rules:
//!
//! 1. The first byte is the type tag; anything other than `+ - : $ *` is
//!    rejected as an unknown type.
//! 2. A line runs up to, but not including, the first CRLF.
//! 3. Integer values and the length prefixes of bulk strings and arrays are
//!    base-10 signed integers.
//! 4. A bulk payload is taken verbatim (it may contain CR or LF) and must be
//!    followed by CRLF. `$-1` is the null bulk string.
//! 5. An array decodes its elements recursively; `*0` is the empty array.
//!    Null arrays are outside the supported subset.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding RESP.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Leading byte is not a known type tag
    #[error("unknown type: {0:#04x}")]
    UnknownType(u8),

    /// A length or integer line is not a base-10 integer
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// Simple string or error text is not UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Negative bulk length other than the null marker
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Negative array length
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Bulk payload is not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingBulkTerminator,

    /// Arrays nested deeper than [`MAX_NESTING_DEPTH`]
    #[error("maximum nesting depth exceeded: {0}")]
    TooDeep(usize),

    /// The message exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Largest accepted bulk payload (512 MiB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Deepest accepted array nesting.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Stateless RESP decoder.
///
/// # Example
///
/// ```
/// use ferrokv::protocol::{RespParser, RespValue};
/// use bytes::Bytes;
///
/// let parser = RespParser::new();
/// let (value, consumed) = parser.parse(b"*1\r\n$4\r\nPING\r\n").unwrap().unwrap();
/// assert_eq!(consumed, 14);
/// assert_eq!(value, RespValue::array(vec![RespValue::bulk_string(Bytes::from("PING"))]));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct RespParser;

impl RespParser {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to decode one value from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.parse_value(buf, 0)
    }

    fn parse_value(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        let Some(&tag) = buf.first() else {
            return Ok(None);
        };

        match tag {
            prefix::SIMPLE_STRING => Ok(parse_text(buf)?.map(|(s, n)| (RespValue::SimpleString(s), n))),
            prefix::ERROR => Ok(parse_text(buf)?.map(|(s, n)| (RespValue::Error(s), n))),
            prefix::INTEGER => Ok(parse_number(buf)?.map(|(v, n)| (RespValue::Integer(v), n))),
            prefix::BULK_STRING => parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf, depth),
            other => Err(ParseError::UnknownType(other)),
        }
    }

    /// `*<count>\r\n<element>...`
    fn parse_array(&self, buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep(MAX_NESTING_DEPTH));
        }

        let Some((count, mut consumed)) = parse_number(buf)? else {
            return Ok(None);
        };
        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }

        let count = count as usize;
        // Cap the preallocation; a hostile count should not reserve memory.
        let mut elements = Vec::with_capacity(count.min(1024));

        for _ in 0..count {
            match self.parse_value(&buf[consumed..], depth + 1)? {
                Some((value, used)) => {
                    elements.push(value);
                    consumed += used;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// `+<text>\r\n` or `-<text>\r\n`
fn parse_text(buf: &[u8]) -> ParseResult<Option<(String, usize)>> {
    let Some((line, consumed)) = read_line(buf) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    Ok(Some((text.to_string(), consumed)))
}

/// `:<int>\r\n`, and the length line of `$` and `*`.
fn parse_number(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let Some((line, consumed)) = read_line(buf) else {
        return Ok(None);
    };
    let number = std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(line).into_owned()))?;
    Ok(Some((number, consumed)))
}

/// `$<len>\r\n<payload>\r\n`, or `$-1\r\n` for null.
fn parse_bulk_string(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some((length, header)) = parse_number(buf)? else {
        return Ok(None);
    };

    if length == -1 {
        return Ok(Some((RespValue::Null, header)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total = header + length + CRLF.len();
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header + length..total] != CRLF {
        return Err(ParseError::MissingBulkTerminator);
    }

    let data = Bytes::copy_from_slice(&buf[header..header + length]);
    Ok(Some((RespValue::BulkString(data), total)))
}

/// Returns the bytes after the type tag up to the first CRLF, plus the
/// number of bytes consumed including tag and terminator.
#[inline]
fn read_line(buf: &[u8]) -> Option<(&[u8], usize)> {
    let body = &buf[1..];
    body.windows(2)
        .position(|w| w == CRLF)
        .map(|pos| (&body[..pos], 1 + pos + CRLF.len()))
}

/// Decodes a single value from a complete buffer.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}
