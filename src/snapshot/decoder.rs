//! RDB Snapshot Decoder
//!
//! An RDB file is a `REDIS` + 4-digit version header followed by a stream
//! of opcode-tagged records and an 8-byte checksum:
//!
//! ```text
//! REDIS0011  FA <aux key> <aux value> ...  FE <db>  FB <size> <expires>
//!            [FD <4 bytes> | FC <8 bytes>]  00 <key> <value>  ...  FF <checksum>
//! ```
//!
//! Only plain string records are turned into `(key, value)` pairs. The
//! bookkeeping records (aux fields, database selection, resize hints,
//! expire times) are consumed and discarded. Anything else stops decoding
//! with an error that still carries the pairs emitted so far, so a caller
//! can keep a partial load instead of mis-reading the rest of the file.
//!
//! ## Length encoding
//!
//! The two high bits of the first byte select the form:
//!
//! | bits | value                                                  |
//! |------|--------------------------------------------------------|
//! | `00` | low 6 bits (0..=63)                                    |
//! | `01` | low 6 bits + next byte, 14-bit big-endian              |
//! | `10` | next 4 bytes, 32-bit big-endian (low 6 bits ignored)   |
//! | `11` | special encoding; low 6 bits name the format           |
//!
//! Special formats 0, 1 and 2 are 8/16/32-bit little-endian integers stored
//! in place of a string. Format 3 (LZF) is not supported.

use bytes::{Buf, Bytes};
use thiserror::Error;
use tracing::debug;

/// Record opcodes.
pub mod opcode {
    /// Value type of a plain string record
    pub const TYPE_STRING: u8 = 0x00;
    pub const AUX: u8 = 0xFA;
    pub const RESIZE_DB: u8 = 0xFB;
    pub const EXPIRE_TIME_MS: u8 = 0xFC;
    pub const EXPIRE_TIME: u8 = 0xFD;
    pub const SELECT_DB: u8 = 0xFE;
    pub const EOF: u8 = 0xFF;
}

/// Magic prefix of the file header.
pub const MAGIC: &[u8] = b"REDIS";

/// Magic plus the 4-digit version.
pub const HEADER_LEN: usize = 9;

pub const CHECKSUM_LEN: usize = 8;

/// Special string encodings behind a `11xxxxxx` length byte.
mod encoding {
    pub const INT8: u8 = 0;
    pub const INT16: u8 = 1;
    pub const INT32: u8 = 2;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("unexpected end of snapshot while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("unsupported opcode {0:#04x}")]
    UnsupportedOpcode(u8),

    #[error("unsupported string encoding {0}")]
    UnsupportedEncoding(u8),

    #[error("snapshot ended without an EOF opcode")]
    MissingEof,
}

/// A decode that stopped early. `pairs` holds everything emitted before
/// the failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{source} (after {} entries)", .pairs.len())]
pub struct PartialSnapshot {
    pub pairs: Vec<(Bytes, Bytes)>,
    #[source]
    pub source: SnapshotError,
}

/// A decoded length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    /// A plain length or integer.
    Len(u32),
    /// `11xxxxxx`: identifier of a special encoded-object format.
    Special(u8),
}

impl Length {
    /// The number the field carries. For a special encoding that is the
    /// format identifier.
    pub fn value(self) -> u32 {
        match self {
            Length::Len(n) => n,
            Length::Special(id) => u32::from(id),
        }
    }
}

type Result<T> = std::result::Result<T, SnapshotError>;

fn take_u8<B: Buf>(buf: &mut B, what: &'static str) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(SnapshotError::UnexpectedEof(what));
    }
    Ok(buf.get_u8())
}

fn take_bytes<B: Buf>(buf: &mut B, len: usize, what: &'static str) -> Result<Bytes> {
    if buf.remaining() < len {
        return Err(SnapshotError::UnexpectedEof(what));
    }
    Ok(buf.copy_to_bytes(len))
}

/// Reads one length-encoded field.
pub fn decode_length<B: Buf>(buf: &mut B) -> Result<Length> {
    let first = take_u8(buf, "length")?;

    match first >> 6 {
        0b00 => Ok(Length::Len(u32::from(first & 0x3F))),
        0b01 => {
            let next = take_u8(buf, "14-bit length")?;
            Ok(Length::Len(u32::from(first & 0x3F) << 8 | u32::from(next)))
        }
        0b10 => {
            if buf.remaining() < 4 {
                return Err(SnapshotError::UnexpectedEof("32-bit length"));
            }
            Ok(Length::Len(buf.get_u32()))
        }
        _ => Ok(Length::Special(first & 0x3F)),
    }
}

/// Reads one length-prefixed string, expanding integer encodings to their
/// decimal text.
pub fn decode_string<B: Buf>(buf: &mut B) -> Result<Bytes> {
    match decode_length(buf)? {
        Length::Len(len) => take_bytes(buf, len as usize, "string"),
        Length::Special(encoding::INT8) => {
            let n = take_u8(buf, "8-bit integer")? as i8;
            Ok(Bytes::from(n.to_string()))
        }
        Length::Special(encoding::INT16) => {
            if buf.remaining() < 2 {
                return Err(SnapshotError::UnexpectedEof("16-bit integer"));
            }
            Ok(Bytes::from(buf.get_i16_le().to_string()))
        }
        Length::Special(encoding::INT32) => {
            if buf.remaining() < 4 {
                return Err(SnapshotError::UnexpectedEof("32-bit integer"));
            }
            Ok(Bytes::from(buf.get_i32_le().to_string()))
        }
        Length::Special(other) => Err(SnapshotError::UnsupportedEncoding(other)),
    }
}

/// Offset of the first record.
///
/// With a `REDIS` header the records start right after it. A headerless
/// fragment starts at its first resize-hint opcode, or at offset 0 if it
/// has none.
pub fn record_stream_start(data: &[u8]) -> usize {
    if data.len() >= HEADER_LEN && data.starts_with(MAGIC) {
        return HEADER_LEN;
    }
    data.iter()
        .position(|&b| b == opcode::RESIZE_DB)
        .unwrap_or(0)
}

/// Walks the record stream and collects the string pairs.
#[derive(Debug)]
pub struct SnapshotDecoder<'a> {
    buf: &'a [u8],
    pairs: Vec<(Bytes, Bytes)>,
}

impl<'a> SnapshotDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: &data[record_stream_start(data)..],
            pairs: Vec::new(),
        }
    }

    pub fn decode(mut self) -> std::result::Result<Vec<(Bytes, Bytes)>, PartialSnapshot> {
        match self.run() {
            Ok(()) => Ok(self.pairs),
            Err(source) => Err(PartialSnapshot {
                pairs: self.pairs,
                source,
            }),
        }
    }

    fn run(&mut self) -> Result<()> {
        loop {
            if !self.buf.has_remaining() {
                return Err(SnapshotError::MissingEof);
            }

            match self.buf.get_u8() {
                opcode::SELECT_DB => {
                    let db = decode_length(&mut self.buf)?.value();
                    debug!(db = db, "Snapshot selects database");
                }
                opcode::AUX => {
                    let key = decode_string(&mut self.buf)?;
                    let value = decode_string(&mut self.buf)?;
                    debug!(
                        key = %String::from_utf8_lossy(&key),
                        value = %String::from_utf8_lossy(&value),
                        "Snapshot aux field"
                    );
                }
                opcode::RESIZE_DB => {
                    let size = decode_length(&mut self.buf)?.value();
                    let expires = decode_length(&mut self.buf)?.value();
                    debug!(size = size, expires = expires, "Snapshot resize hint");
                }
                opcode::EXPIRE_TIME => {
                    take_bytes(&mut self.buf, 4, "expire time")?;
                }
                opcode::EXPIRE_TIME_MS => {
                    take_bytes(&mut self.buf, 8, "expire time")?;
                }
                opcode::TYPE_STRING => {
                    let key = decode_string(&mut self.buf)?;
                    let value = decode_string(&mut self.buf)?;
                    self.pairs.push((key, value));
                }
                opcode::EOF => {
                    take_bytes(&mut self.buf, CHECKSUM_LEN, "checksum")?;
                    return Ok(());
                }
                other => return Err(SnapshotError::UnsupportedOpcode(other)),
            }
        }
    }
}

/// Decodes every string pair in `data`.
///
/// # Example
///
/// ```
/// use ferrokv::snapshot::decode;
/// use bytes::Bytes;
///
/// let data = b"\xFB\x01\x00\x00\x03foo\x03bar\xFF\0\0\0\0\0\0\0\0";
/// let pairs = decode(data).unwrap();
/// assert_eq!(pairs, vec![(Bytes::from("foo"), Bytes::from("bar"))]);
/// ```
pub fn decode(data: &[u8]) -> std::result::Result<Vec<(Bytes, Bytes)>, PartialSnapshot> {
    SnapshotDecoder::new(data).decode()
}
