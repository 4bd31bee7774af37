use crate::foundation::{AccordError, Hash32};

fn strip_hex_prefix(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed)
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>, AccordError> {
    hex::decode(s).map_err(|e| e.into())
}

/// Parses a hex string (optional `0x` prefix) into raw bytes.
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, AccordError> {
    decode_hex(strip_hex_prefix(s))
}

/// Parses a hex string (optional `0x` prefix) into exactly 32 bytes.
pub fn parse_hex_32bytes(s: &str) -> Result<Hash32, AccordError> {
    let bytes = parse_hex_bytes(s)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| AccordError::EncodingError(format!("expected 32 bytes, got {} bytes", len)))
}
