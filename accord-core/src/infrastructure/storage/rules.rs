//! Write rules shared by every storage backend.

use super::traits::SignatureWrite;
use crate::domain::contract::ContractSigner;
use crate::domain::linkage::{chain, latest_transaction_ref};
use crate::domain::Contract;
use crate::foundation::{AccordError, RegistryError};

/// Applies a signature to the in-memory rows of one contract and returns the index of the
/// flipped row. Callers hold the contract's write lock and persist the result atomically.
pub(crate) fn apply_signature(contract: &mut Contract, signers: &mut [ContractSigner], write: &SignatureWrite) -> Result<usize, AccordError> {
    let index = signers
        .iter()
        .position(|row| row.user_id == write.user_id)
        .ok_or(RegistryError::SignerNotFound { contract_id: write.contract_id, user_id: write.user_id })?;
    if signers[index].is_signed() {
        return Err(RegistryError::AlreadySigned { contract_id: write.contract_id, user_id: write.user_id }.into());
    }

    let latest = latest_transaction_ref(contract.genesis_tx_ref, signers);
    if let Some(expected) = write.expected_parent {
        if expected != latest {
            return Err(RegistryError::ChainConflict { contract_id: write.contract_id, expected, actual: latest }.into());
        }
    }

    // signed_at must strictly increase along the chain so ordering by it reproduces the links.
    let previous_signed_at = chain(signers).last().and_then(|row| row.signed_at_nanos);
    let signed_at = match previous_signed_at {
        Some(previous) if write.signed_at_nanos <= previous => previous.saturating_add(1),
        _ => write.signed_at_nanos,
    };

    signers[index].mark_signed(write.tx_ref, latest, signed_at);
    let signed_rows = signers.iter().filter(|row| row.is_signed()).count();
    contract.status = contract.status.after_signature(signed_rows, signers.len(), write.threshold_reached);
    contract.updated_at_nanos = signed_at;
    Ok(index)
}
