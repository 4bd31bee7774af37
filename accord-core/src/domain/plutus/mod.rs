//! Plutus-data CBOR: a tolerant reader and the ledger's canonical writer.

pub mod cbor;
pub mod data;

pub use cbor::{decode, CborValue};
pub use data::{constr_index, constr_tag, PlutusData};
