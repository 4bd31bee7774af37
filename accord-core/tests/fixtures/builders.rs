#![allow(dead_code)]

use crate::fixtures::KEY_HASH_LEN;
use accord_core::domain::StructuredRecord;
use accord_core::foundation::{DocumentHash, KeyHash, TxRef};

pub fn key(byte: u8) -> KeyHash {
    KeyHash::new(vec![byte; KEY_HASH_LEN])
}

pub fn tx(byte: u8) -> TxRef {
    TxRef::new([byte; 32])
}

pub struct RecordBuilder {
    document_hash: Vec<u8>,
    required: Vec<KeyHash>,
    collected: Vec<KeyHash>,
    threshold: i64,
    creator: KeyHash,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self {
            document_hash: vec![0xdd; 32],
            required: vec![key(b'A'), key(b'B'), key(b'C')],
            collected: Vec::new(),
            threshold: 2,
            creator: key(b'Z'),
        }
    }
}

impl RecordBuilder {
    pub fn document_hash(mut self, document_hash: impl Into<Vec<u8>>) -> Self {
        self.document_hash = document_hash.into();
        self
    }

    pub fn required(mut self, required: Vec<KeyHash>) -> Self {
        self.required = required;
        self
    }

    pub fn collected(mut self, collected: Vec<KeyHash>) -> Self {
        self.collected = collected;
        self
    }

    pub fn threshold(mut self, threshold: i64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn build(self) -> StructuredRecord {
        let mut record = StructuredRecord::genesis(DocumentHash::new(self.document_hash), self.required, self.threshold, self.creator);
        record.signatures_collected = self.collected;
        record
    }
}
