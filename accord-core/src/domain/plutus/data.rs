use super::cbor::{write_head, write_indefinite, BREAK, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_TAG, MAJOR_UNSIGNED};
use crate::foundation::PLUTUS_BYTES_CHUNK;

/// Constructor tag for compact indices 0..=6.
pub const TAG_CONSTR_BASE: u64 = 121;
/// Constructor tag for compact indices 7..=127.
pub const TAG_CONSTR_EXTENDED_BASE: u64 = 1280;
/// General constructor tag wrapping `[index, fields]`.
pub const TAG_CONSTR_GENERAL: u64 = 102;

/// Plutus data as the ledger serializes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlutusData {
    Constr(u64, Vec<PlutusData>),
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(i64),
    Bytes(Vec<u8>),
}

impl PlutusData {
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            PlutusData::Constr(index, fields) => encode_constr(out, *index, fields),
            PlutusData::Map(entries) => {
                write_head(out, MAJOR_MAP, entries.len() as u64);
                for (key, value) in entries {
                    key.encode_into(out);
                    value.encode_into(out);
                }
            }
            PlutusData::List(items) => encode_list(out, items),
            PlutusData::Integer(value) => {
                if *value >= 0 {
                    write_head(out, MAJOR_UNSIGNED, *value as u64);
                } else {
                    // -1 - value without overflow at i64::MIN
                    write_head(out, MAJOR_NEGATIVE, !(*value) as u64);
                }
            }
            PlutusData::Bytes(bytes) => encode_bytes(out, bytes),
        }
    }
}

/// Tag number for a constructor index, or `None` when the general form is required.
pub fn constr_tag(index: u64) -> Option<u64> {
    match index {
        0..=6 => Some(TAG_CONSTR_BASE + index),
        7..=127 => Some(TAG_CONSTR_EXTENDED_BASE + index - 7),
        _ => None,
    }
}

/// Inverse of [`constr_tag`] for compact tags.
pub fn constr_index(tag: u64) -> Option<u64> {
    match tag {
        121..=127 => Some(tag - TAG_CONSTR_BASE),
        1280..=1400 => Some(tag - TAG_CONSTR_EXTENDED_BASE + 7),
        _ => None,
    }
}

fn encode_constr(out: &mut Vec<u8>, index: u64, fields: &[PlutusData]) {
    match constr_tag(index) {
        Some(tag) => {
            write_head(out, MAJOR_TAG, tag);
            encode_list(out, fields);
        }
        None => {
            write_head(out, MAJOR_TAG, TAG_CONSTR_GENERAL);
            write_head(out, MAJOR_ARRAY, 2);
            write_head(out, MAJOR_UNSIGNED, index);
            encode_list(out, fields);
        }
    }
}

fn encode_list(out: &mut Vec<u8>, items: &[PlutusData]) {
    if items.is_empty() {
        write_head(out, MAJOR_ARRAY, 0);
        return;
    }
    write_indefinite(out, MAJOR_ARRAY);
    for item in items {
        item.encode_into(out);
    }
    out.push(BREAK);
}

fn encode_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.len() <= PLUTUS_BYTES_CHUNK {
        write_head(out, MAJOR_BYTES, bytes.len() as u64);
        out.extend_from_slice(bytes);
        return;
    }
    write_indefinite(out, MAJOR_BYTES);
    for chunk in bytes.chunks(PLUTUS_BYTES_CHUNK) {
        write_head(out, MAJOR_BYTES, chunk.len() as u64);
        out.extend_from_slice(chunk);
    }
    out.push(BREAK);
}
