//! Canonical CBOR encoding for the record wire format.
//!
//! This module implements the deterministic subset the record format rides on:
//! - Integers and lengths use the smallest valid encoding
//! - Definite lengths only
//! - Map keys sorted by encoded byte comparison
//! - No floats
//!
//! The canonical form is critical: a record must produce identical bytes on
//! every platform, and two encodings of the same record must be bit-equal so
//! signatures stay valid. The [`Reader`] is the strict counterpart used when
//! decoding untrusted input: it rejects non-minimal headers, indefinite
//! lengths, and truncated data with distinct errors instead of guessing.

use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the canonical codec.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("trailing bytes after value")]
    TrailingBytes,

    #[error("expected {expected}, got cbor major type {found}")]
    TypeMismatch { expected: &'static str, found: u8 },

    #[error("integer header is not minimally encoded")]
    NonCanonicalInt,

    #[error("indefinite-length items are not allowed")]
    IndefiniteLength,

    #[error("unsupported item in canonical encoding")]
    UnsupportedItem,

    #[error("nested length overflows")]
    LengthOverflow,

    #[error("invalid utf-8 in text string")]
    InvalidUtf8,

    #[error("entry value: {0}")]
    Value(String),
}

/// Encode an unsigned integer with the given major type, minimal form.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Recursively encode a CBOR value in canonical form.
fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<(), WireError> {
    match value {
        Value::Integer(i) => {
            let n: i128 = (*i).into();
            if n >= 0 {
                encode_uint(buf, 0, n as u64);
            } else {
                encode_uint(buf, 1, (-1 - n) as u64);
            }
        }
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value(buf, item)?;
            }
        }
        Value::Map(entries) => {
            encode_map(buf, entries)?;
        }
        Value::Bool(b) => {
            buf.push(if *b { 0xf5 } else { 0xf4 });
        }
        Value::Null => {
            buf.push(0xf6);
        }
        _ => return Err(WireError::UnsupportedItem),
    }
    Ok(())
}

/// Encode a map canonically: keys sorted by their encoded bytes.
fn encode_map(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), WireError> {
    let mut pairs: Vec<(Vec<u8>, &Value)> = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, value)?;
    }
    Ok(())
}

/// Encode an entry value to its canonical bytes.
///
/// Serde output is re-encoded through [`Value`] so map keys always land in
/// canonical order regardless of the entry type's field order.
pub fn encode_entry<T: Serialize>(entry: &T) -> Result<Vec<u8>, WireError> {
    let mut plain = Vec::new();
    ciborium::into_writer(entry, &mut plain).map_err(|err| WireError::Value(err.to_string()))?;
    let value: Value =
        ciborium::from_reader(plain.as_slice()).map_err(|err| WireError::Value(err.to_string()))?;

    let mut buf = Vec::new();
    encode_value(&mut buf, &value)?;
    Ok(buf)
}

/// Decode an entry value from its canonical bytes.
pub fn decode_entry<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    ciborium::from_reader(bytes).map_err(|err| WireError::Value(err.to_string()))
}

/// Builder for a definite-length array of elements.
///
/// Elements pushed via [`ListBuilder::push_raw`] must already be exactly one
/// canonical item; they are spliced in verbatim, never re-encoded.
#[derive(Debug, Default)]
pub struct ListBuilder {
    count: u64,
    body: Vec<u8>,
}

impl ListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_uint(&mut self, n: u64) {
        encode_uint(&mut self.body, 0, n);
        self.count += 1;
    }

    pub fn push_bytes(&mut self, b: &[u8]) {
        encode_uint(&mut self.body, 2, b.len() as u64);
        self.body.extend_from_slice(b);
        self.count += 1;
    }

    pub fn push_text(&mut self, s: &str) {
        encode_uint(&mut self.body, 3, s.len() as u64);
        self.body.extend_from_slice(s.as_bytes());
        self.count += 1;
    }

    pub fn push_raw(&mut self, raw: &[u8]) {
        self.body.extend_from_slice(raw);
        self.count += 1;
    }

    /// Wrap the accumulated elements with the array header.
    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 9);
        encode_uint(&mut out, 4, self.count);
        out.extend_from_slice(&self.body);
        out
    }
}

/// Encoded size of an integer or length header.
pub const fn head_size(arg: u64) -> u64 {
    if arg < 24 {
        1
    } else if arg <= 0xff {
        2
    } else if arg <= 0xffff {
        3
    } else if arg <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Encoded size of an unsigned integer element.
pub const fn uint_size(n: u64) -> u64 {
    head_size(n)
}

/// Encoded size of a byte string of the given length.
pub const fn bytes_size(len: u64) -> u64 {
    head_size(len) + len
}

/// Encoded size of a text string of the given length.
pub const fn text_size(len: u64) -> u64 {
    head_size(len) + len
}

/// Encoded size of an array with `count` elements and `payload` body bytes.
pub const fn list_size(count: u64, payload: u64) -> u64 {
    head_size(count) + payload
}

/// Strict cursor over canonical bytes.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// True once every input byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof);
        }
        let span = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(span)
    }

    fn take_arr<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let span = self.take(N)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(span);
        Ok(arr)
    }

    /// Read one item header, enforcing minimal encoding.
    fn read_head(&mut self) -> Result<(u8, u64), WireError> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;
        if major == 7 && info >= 24 {
            // Floats and extended simple values never appear in canonical form.
            return Err(WireError::UnsupportedItem);
        }
        let arg = match info {
            0..=23 => u64::from(info),
            24 => {
                let v = u64::from(self.take(1)?[0]);
                if v < 24 {
                    return Err(WireError::NonCanonicalInt);
                }
                v
            }
            25 => {
                let v = u64::from(u16::from_be_bytes(self.take_arr()?));
                if v <= 0xff {
                    return Err(WireError::NonCanonicalInt);
                }
                v
            }
            26 => {
                let v = u64::from(u32::from_be_bytes(self.take_arr()?));
                if v <= 0xffff {
                    return Err(WireError::NonCanonicalInt);
                }
                v
            }
            27 => {
                let v = u64::from_be_bytes(self.take_arr()?);
                if v <= 0xffff_ffff {
                    return Err(WireError::NonCanonicalInt);
                }
                v
            }
            28..=30 => return Err(WireError::UnsupportedItem),
            _ => return Err(WireError::IndefiniteLength),
        };
        Ok((major, arg))
    }

    /// Read an array header, returning the element count.
    pub fn array_header(&mut self) -> Result<u64, WireError> {
        match self.read_head()? {
            (4, n) => Ok(n),
            (major, _) => Err(WireError::TypeMismatch {
                expected: "array",
                found: major,
            }),
        }
    }

    /// Read an unsigned integer element.
    pub fn uint(&mut self) -> Result<u64, WireError> {
        match self.read_head()? {
            (0, n) => Ok(n),
            (major, _) => Err(WireError::TypeMismatch {
                expected: "unsigned integer",
                found: major,
            }),
        }
    }

    /// Read a byte string element.
    pub fn bytes(&mut self) -> Result<&'a [u8], WireError> {
        match self.read_head()? {
            (2, len) => {
                let len = usize::try_from(len).map_err(|_| WireError::UnexpectedEof)?;
                self.take(len)
            }
            (major, _) => Err(WireError::TypeMismatch {
                expected: "byte string",
                found: major,
            }),
        }
    }

    /// Read a text string element.
    pub fn text(&mut self) -> Result<&'a str, WireError> {
        match self.read_head()? {
            (3, len) => {
                let len = usize::try_from(len).map_err(|_| WireError::UnexpectedEof)?;
                let span = self.take(len)?;
                std::str::from_utf8(span).map_err(|_| WireError::InvalidUtf8)
            }
            (major, _) => Err(WireError::TypeMismatch {
                expected: "text string",
                found: major,
            }),
        }
    }

    /// Skip exactly one item, nesting included, and return its raw span.
    pub fn raw_item(&mut self) -> Result<&'a [u8], WireError> {
        let start = self.pos;
        let mut pending: u64 = 1;
        while pending > 0 {
            pending -= 1;
            let (major, arg) = self.read_head()?;
            match major {
                0 | 1 | 7 => {}
                2 | 3 => {
                    let len = usize::try_from(arg).map_err(|_| WireError::UnexpectedEof)?;
                    self.take(len)?;
                }
                4 => {
                    pending = pending.checked_add(arg).ok_or(WireError::LengthOverflow)?;
                }
                5 => {
                    let entries = arg.checked_mul(2).ok_or(WireError::LengthOverflow)?;
                    pending = pending
                        .checked_add(entries)
                        .ok_or(WireError::LengthOverflow)?;
                }
                // Tag: one nested item follows the tag number.
                _ => {
                    pending = pending.checked_add(1).ok_or(WireError::LengthOverflow)?;
                }
            }
        }
        Ok(&self.buf[start..self.pos])
    }
}
