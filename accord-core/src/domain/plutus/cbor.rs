//! Minimal CBOR reader and head writer for Plutus data.
//!
//! Supports the subset the ledger produces: integers, byte/text strings (definite and
//! chunked), arrays and maps (definite and indefinite), tags and simple values.
//! Floats are rejected.

use crate::foundation::{DecodeError, MAX_CBOR_DEPTH, MAX_RECORD_BYTES};

pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

const INFO_INDEFINITE: u8 = 31;
pub const BREAK: u8 = 0xff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CborValue {
    Unsigned(u64),
    /// Encodes `-1 - n`.
    Negative(u64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(Vec<(CborValue, CborValue)>),
    Tag(u64, Box<CborValue>),
    Simple(u8),
}

impl CborValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CborValue::Unsigned(_) => "unsigned",
            CborValue::Negative(_) => "negative",
            CborValue::Bytes(_) => "bytes",
            CborValue::Text(_) => "text",
            CborValue::Array(_) => "array",
            CborValue::Map(_) => "map",
            CborValue::Tag(_, _) => "tag",
            CborValue::Simple(_) => "simple",
        }
    }
}

/// Decodes exactly one CBOR item; trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<CborValue, DecodeError> {
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(DecodeError::TooLarge { size: bytes.len(), max: MAX_RECORD_BYTES });
    }
    let mut reader = Reader { bytes, pos: 0 };
    let value = reader.value(0)?;
    if reader.pos != bytes.len() {
        return Err(reader.malformed(format!("{} trailing bytes", bytes.len() - reader.pos)));
    }
    Ok(value)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

enum Head {
    Definite(u64),
    Indefinite,
}

impl<'a> Reader<'a> {
    fn malformed(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::Malformed { offset: self.pos, reason: reason.into() }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn peek(&self) -> Result<u8, DecodeError> {
        self.bytes.get(self.pos).copied().ok_or_else(|| self.malformed("unexpected end of input"))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(self.malformed(format!("need {} bytes, {} remain", len, self.remaining())));
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn head(&mut self) -> Result<(u8, u8, Head), DecodeError> {
        let initial = self.peek()?;
        self.pos += 1;
        let major = initial >> 5;
        let info = initial & 0x1f;
        let head = match info {
            0..=23 => Head::Definite(u64::from(info)),
            24 => Head::Definite(u64::from(self.take(1)?[0])),
            25 => {
                let raw = self.take(2)?;
                Head::Definite(u64::from(u16::from_be_bytes([raw[0], raw[1]])))
            }
            26 => {
                let raw = self.take(4)?;
                Head::Definite(u64::from(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])))
            }
            27 => {
                let raw = self.take(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(raw);
                Head::Definite(u64::from_be_bytes(buf))
            }
            INFO_INDEFINITE => Head::Indefinite,
            _ => return Err(DecodeError::Malformed { offset: self.pos - 1, reason: format!("reserved additional info {}", info) }),
        };
        Ok((major, info, head))
    }

    fn length(&self, value: u64) -> Result<usize, DecodeError> {
        usize::try_from(value).map_err(|_| self.malformed(format!("length {} does not fit in memory", value)))
    }

    fn value(&mut self, depth: usize) -> Result<CborValue, DecodeError> {
        if depth > MAX_CBOR_DEPTH {
            return Err(self.malformed(format!("nesting deeper than {}", MAX_CBOR_DEPTH)));
        }
        let start = self.pos;
        let (major, info, head) = self.head()?;
        match (major, head) {
            (MAJOR_UNSIGNED, Head::Definite(n)) => Ok(CborValue::Unsigned(n)),
            (MAJOR_NEGATIVE, Head::Definite(n)) => Ok(CborValue::Negative(n)),
            (MAJOR_BYTES, head) => Ok(CborValue::Bytes(self.string_body(MAJOR_BYTES, head)?)),
            (MAJOR_TEXT, head) => {
                let raw = self.string_body(MAJOR_TEXT, head)?;
                String::from_utf8(raw)
                    .map(CborValue::Text)
                    .map_err(|_| DecodeError::Malformed { offset: start, reason: "text string is not utf-8".to_string() })
            }
            (MAJOR_ARRAY, Head::Definite(count)) => {
                let count = self.length(count)?;
                // Every item needs at least one byte.
                if count > self.remaining() {
                    return Err(self.malformed(format!("array of {} items exceeds input", count)));
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.value(depth + 1)?);
                }
                Ok(CborValue::Array(items))
            }
            (MAJOR_ARRAY, Head::Indefinite) => {
                let mut items = Vec::new();
                while self.peek()? != BREAK {
                    items.push(self.value(depth + 1)?);
                }
                self.pos += 1;
                Ok(CborValue::Array(items))
            }
            (MAJOR_MAP, Head::Definite(count)) => {
                let count = self.length(count)?;
                if count > self.remaining() / 2 {
                    return Err(self.malformed(format!("map of {} entries exceeds input", count)));
                }
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = self.value(depth + 1)?;
                    let value = self.value(depth + 1)?;
                    entries.push((key, value));
                }
                Ok(CborValue::Map(entries))
            }
            (MAJOR_MAP, Head::Indefinite) => {
                let mut entries = Vec::new();
                while self.peek()? != BREAK {
                    let key = self.value(depth + 1)?;
                    let value = self.value(depth + 1)?;
                    entries.push((key, value));
                }
                self.pos += 1;
                Ok(CborValue::Map(entries))
            }
            (MAJOR_TAG, Head::Definite(tag)) => Ok(CborValue::Tag(tag, Box::new(self.value(depth + 1)?))),
            (MAJOR_SIMPLE, Head::Definite(n)) if info <= 24 => Ok(CborValue::Simple(n as u8)),
            (MAJOR_SIMPLE, Head::Definite(_)) => {
                Err(DecodeError::Malformed { offset: start, reason: "floating point values are not supported".to_string() })
            }
            (MAJOR_SIMPLE, Head::Indefinite) => Err(DecodeError::Malformed { offset: start, reason: "unexpected break".to_string() }),
            (major, Head::Indefinite) => {
                Err(DecodeError::Malformed { offset: start, reason: format!("indefinite length not allowed for major type {}", major) })
            }
            (major, Head::Definite(_)) => Err(DecodeError::Malformed { offset: start, reason: format!("unknown major type {}", major) }),
        }
    }

    fn string_body(&mut self, major: u8, head: Head) -> Result<Vec<u8>, DecodeError> {
        match head {
            Head::Definite(len) => {
                let len = self.length(len)?;
                Ok(self.take(len)?.to_vec())
            }
            Head::Indefinite => {
                let mut out = Vec::new();
                while self.peek()? != BREAK {
                    let chunk_start = self.pos;
                    let (chunk_major, _, chunk_head) = self.head()?;
                    let len = match (chunk_major == major, chunk_head) {
                        (true, Head::Definite(len)) => self.length(len)?,
                        _ => {
                            return Err(DecodeError::Malformed {
                                offset: chunk_start,
                                reason: "chunk of indefinite string has wrong type".to_string(),
                            })
                        }
                    };
                    out.extend_from_slice(self.take(len)?);
                }
                self.pos += 1;
                Ok(out)
            }
        }
    }
}

/// Writes a head with the shortest argument encoding.
pub fn write_head(out: &mut Vec<u8>, major: u8, value: u64) {
    let major = major << 5;
    if value < 24 {
        out.push(major | value as u8);
    } else if value <= u64::from(u8::MAX) {
        out.push(major | 24);
        out.push(value as u8);
    } else if value <= u64::from(u16::MAX) {
        out.push(major | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u64::from(u32::MAX) {
        out.push(major | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

pub fn write_indefinite(out: &mut Vec<u8>, major: u8) {
    out.push((major << 5) | INFO_INDEFINITE);
}
