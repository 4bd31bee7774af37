use crate::fixtures::*;
use accord_core::domain::plutus::PlutusData;
use accord_core::domain::record::{decode_record, decode_record_hex, encode_record};
use accord_core::foundation::{DecodeError, KeyHash};

#[test]
fn reference_datum_decodes_and_reencodes_byte_identically() {
    let record = decode_record_hex(REFERENCE_DATUM_HEX).expect("decode");
    assert_eq!(record.document_hash.as_bytes(), REFERENCE_DOCUMENT_HASH);
    assert_eq!(record.required_signers, vec![KeyHash::new(hex::decode(REFERENCE_SIGNER_HEX).expect("hex"))]);
    assert!(record.signatures_collected.is_empty());
    assert_eq!(record.threshold, 1);
    assert_eq!(record.creator, KeyHash::new(hex::decode(REFERENCE_CREATOR_HEX).expect("hex")));

    assert_eq!(hex::encode(encode_record(&record)), REFERENCE_DATUM_HEX);
    let prefixed = format!("0x{REFERENCE_DATUM_HEX}");
    assert_eq!(decode_record_hex(&prefixed).expect("prefixed"), record);
}

#[test]
fn long_document_hash_survives_chunked_encoding() {
    let record = RecordBuilder::default().document_hash(vec![0x5a; 150]).collected(vec![key(b'A')]).build();
    let bytes = encode_record(&record);
    assert!(bytes.windows(2).any(|w| w == [0x5f, 0x58]), "expected an indefinite byte string");
    assert_eq!(decode_record(&bytes).expect("decode"), record);
}

#[test]
fn field_count_other_than_five_is_rejected() {
    for count in [0usize, 4, 6] {
        let fields = (0..count).map(|i| PlutusData::Integer(i as i64)).collect();
        let bytes = PlutusData::Constr(0, fields).to_cbor();
        assert_eq!(decode_record(&bytes), Err(DecodeError::WrongFieldCount { expected: 5, got: count }));
    }
}

#[test]
fn non_zero_constructor_is_an_unexpected_shape() {
    let fields = vec![
        PlutusData::Bytes(vec![1]),
        PlutusData::List(vec![]),
        PlutusData::List(vec![]),
        PlutusData::Integer(1),
        PlutusData::Bytes(vec![2]),
    ];
    let bytes = PlutusData::Constr(1, fields).to_cbor();
    assert!(matches!(decode_record(&bytes), Err(DecodeError::UnexpectedShape(_))));
}

#[test]
fn truncated_and_trailing_input_is_malformed() {
    let bytes = hex::decode(REFERENCE_DATUM_HEX).expect("hex");
    assert!(matches!(decode_record(&bytes[..bytes.len() - 1]), Err(DecodeError::Malformed { .. })));

    let mut trailing = bytes.clone();
    trailing.push(0x00);
    assert!(matches!(decode_record(&trailing), Err(DecodeError::Malformed { .. })));

    assert!(matches!(decode_record_hex("zz"), Err(DecodeError::Malformed { offset: 0, .. })));
}
