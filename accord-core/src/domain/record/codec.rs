use super::shape::RecordShape;
use super::types::{StructuredRecord, TransitionAction, TransitionRequest};
use crate::domain::plutus::{self, CborValue, PlutusData};
use crate::foundation::util::encoding::parse_hex_bytes;
use crate::foundation::{DecodeError, DocumentHash, KeyHash, RECORD_FIELD_COUNT};

const REQUEST_FIELD_COUNT: usize = 2;

pub const FIELD_DOCUMENT_HASH: &str = "document_hash";
pub const FIELD_REQUIRED_SIGNERS: &str = "required_signers";
pub const FIELD_SIGNATURES_COLLECTED: &str = "signatures_collected";
pub const FIELD_THRESHOLD: &str = "threshold";
pub const FIELD_CREATOR: &str = "creator";
pub const FIELD_ACTION: &str = "action";
pub const FIELD_SIGNER: &str = "signer";

pub fn decode_record(bytes: &[u8]) -> Result<StructuredRecord, DecodeError> {
    let value = plutus::decode(bytes)?;
    record_from_value(&value)
}

pub fn decode_record_hex(record_hex: &str) -> Result<StructuredRecord, DecodeError> {
    let bytes = parse_hex_bytes(record_hex)
        .map_err(|err| DecodeError::Malformed { offset: 0, reason: format!("invalid record hex: {}", err) })?;
    decode_record(&bytes)
}

pub fn record_from_value(value: &CborValue) -> Result<StructuredRecord, DecodeError> {
    let fields = RecordShape::classify(value)?.constructor_zero_fields()?;
    if fields.len() != RECORD_FIELD_COUNT {
        return Err(DecodeError::WrongFieldCount { expected: RECORD_FIELD_COUNT, got: fields.len() });
    }
    Ok(StructuredRecord {
        document_hash: DocumentHash::new(bytes_field(&fields[0], FIELD_DOCUMENT_HASH)?),
        required_signers: key_list_field(&fields[1], FIELD_REQUIRED_SIGNERS)?,
        signatures_collected: key_list_field(&fields[2], FIELD_SIGNATURES_COLLECTED)?,
        threshold: integer_field(&fields[3], FIELD_THRESHOLD)?,
        creator: KeyHash::new(bytes_field(&fields[4], FIELD_CREATOR)?),
    })
}

/// Canonical tagged-constructor encoding. List order is preserved as given.
pub fn encode_record(record: &StructuredRecord) -> Vec<u8> {
    record_to_data(record).to_cbor()
}

pub fn record_to_data(record: &StructuredRecord) -> PlutusData {
    PlutusData::Constr(
        0,
        vec![
            PlutusData::Bytes(record.document_hash.as_bytes().to_vec()),
            key_list(&record.required_signers),
            key_list(&record.signatures_collected),
            PlutusData::Integer(record.threshold),
            PlutusData::Bytes(record.creator.as_bytes().to_vec()),
        ],
    )
}

pub fn encode_request(request: &TransitionRequest) -> Vec<u8> {
    PlutusData::Constr(
        0,
        vec![PlutusData::Bytes(request.action.as_bytes().to_vec()), PlutusData::Bytes(request.signer.as_bytes().to_vec())],
    )
    .to_cbor()
}

pub fn decode_request(bytes: &[u8]) -> Result<TransitionRequest, DecodeError> {
    let value = plutus::decode(bytes)?;
    let fields = RecordShape::classify(&value)?.constructor_zero_fields()?;
    if fields.len() != REQUEST_FIELD_COUNT {
        return Err(DecodeError::WrongFieldCount { expected: REQUEST_FIELD_COUNT, got: fields.len() });
    }
    // Action names are plain words, so text is taken literally rather than as hex.
    let action = match &fields[0] {
        CborValue::Bytes(bytes) => TransitionAction::from_bytes(bytes),
        CborValue::Text(text) => TransitionAction::from_bytes(text.as_bytes()),
        _ => return Err(DecodeError::BadField(FIELD_ACTION)),
    };
    let signer = KeyHash::new(bytes_field(&fields[1], FIELD_SIGNER)?);
    Ok(TransitionRequest { action, signer })
}

fn key_list(keys: &[KeyHash]) -> PlutusData {
    PlutusData::List(keys.iter().map(|key| PlutusData::Bytes(key.as_bytes().to_vec())).collect())
}

fn bytes_field(value: &CborValue, field: &'static str) -> Result<Vec<u8>, DecodeError> {
    match value {
        CborValue::Bytes(bytes) => Ok(bytes.clone()),
        CborValue::Text(text) => parse_hex_bytes(text).map_err(|_| DecodeError::BadField(field)),
        _ => Err(DecodeError::BadField(field)),
    }
}

fn key_list_field(value: &CborValue, field: &'static str) -> Result<Vec<KeyHash>, DecodeError> {
    match value {
        CborValue::Array(items) => items.iter().map(|item| bytes_field(item, field).map(KeyHash::new)).collect(),
        _ => Err(DecodeError::BadField(field)),
    }
}

fn integer_field(value: &CborValue, field: &'static str) -> Result<i64, DecodeError> {
    match value {
        CborValue::Unsigned(n) => i64::try_from(*n).map_err(|_| DecodeError::BadNumber(field)),
        CborValue::Negative(n) => i64::try_from(*n).map(|n| -1 - n).map_err(|_| DecodeError::BadNumber(field)),
        CborValue::Text(text) => text.trim().parse::<i64>().map_err(|_| DecodeError::BadNumber(field)),
        _ => Err(DecodeError::BadNumber(field)),
    }
}
