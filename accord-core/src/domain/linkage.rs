//! Hash-chain linkage between successive signing transactions of one contract.

use crate::domain::contract::ContractSigner;
use crate::foundation::{SignerRowId, TxRef};
use serde::{Deserialize, Serialize};

/// Signed rows in chain order: `signed_at` ascending, ties by insertion order.
pub fn chain(signers: &[ContractSigner]) -> Vec<&ContractSigner> {
    let mut signed: Vec<&ContractSigner> = signers.iter().filter(|row| row.is_signed()).collect();
    signed.sort_by_key(|row| (row.signed_at_nanos.unwrap_or_default(), row.id));
    signed
}

/// Reference the next signing transaction must build on.
pub fn latest_transaction_ref(genesis: TxRef, signers: &[ContractSigner]) -> TxRef {
    chain(signers).last().and_then(|row| row.tx_ref).unwrap_or(genesis)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    pub position: usize,
    pub row_id: SignerRowId,
    pub expected_parent: TxRef,
    pub actual_parent: Option<TxRef>,
}

/// Checks `parent[i] == tx[i-1]` (genesis for the first link) and that no row lacks a reference.
pub fn verify_chain(genesis: TxRef, signers: &[ContractSigner]) -> Result<Vec<TxRef>, ChainBreak> {
    let mut expected = genesis;
    let mut refs = Vec::new();
    for (position, row) in chain(signers).into_iter().enumerate() {
        let broken = ChainBreak { position, row_id: row.id, expected_parent: expected, actual_parent: row.parent_tx_ref };
        match (row.parent_tx_ref, row.tx_ref) {
            (Some(parent), Some(tx_ref)) if parent == expected => {
                refs.push(tx_ref);
                expected = tx_ref;
            }
            _ => return Err(broken),
        }
    }
    Ok(refs)
}
