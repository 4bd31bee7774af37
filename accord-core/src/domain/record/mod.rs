//! Contract record and signing redeemer, as carried on the ledger.

pub mod codec;
pub mod shape;
pub mod types;

pub use codec::{decode_record, decode_record_hex, decode_request, encode_record, encode_request, record_from_value};
pub use shape::RecordShape;
pub use types::{StructuredRecord, TransitionAction, TransitionRequest};
