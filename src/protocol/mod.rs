//! RESP Protocol Codec
//!
//! Converts raw bytes to and from the [`RespValue`] model.
//!
//! - `types`: the value model and its encoder
//! - `parser`: the incremental decoder
//!
//! ## Example
//!
//! ```
//! use ferrokv::protocol::{parse_message, RespValue};
//! use bytes::Bytes;
//!
//! let (request, _) = parse_message(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap().unwrap();
//! assert_eq!(request.into_array().map(|a| a.len()), Some(2));
//!
//! let reply = RespValue::bulk_string(Bytes::from("bar"));
//! assert_eq!(reply.serialize(), b"$3\r\nbar\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
