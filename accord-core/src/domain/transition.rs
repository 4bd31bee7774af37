use crate::domain::record::{StructuredRecord, TransitionAction, TransitionRequest};
use crate::foundation::{KeyHash, TransitionError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Pre-flight replica of the ledger script's signing rule.
///
/// Checks run in a fixed order so the first failing rule is always the one reported:
/// action, membership, idempotency, co-signature, threshold. On success the signer is
/// appended to `signatures_collected` and nothing else changes.
pub fn can_sign(record: &StructuredRecord, request: &TransitionRequest, tx_signers: &[KeyHash]) -> Result<StructuredRecord, TransitionError> {
    if request.action != TransitionAction::SignContract {
        return Err(TransitionError::WrongAction { action: request.action.to_string() });
    }
    let signer = &request.signer;
    if !record.is_required(signer) {
        return Err(TransitionError::NotAuthorizedSigner(signer.clone()));
    }
    if record.has_signed(signer) {
        return Err(TransitionError::AlreadySigned(signer.clone()));
    }
    if !tx_signers.iter().any(|tx_signer| tx_signer == signer) {
        return Err(TransitionError::TransactionNotCoSigned(signer.clone()));
    }
    if record.threshold < 1 {
        return Err(TransitionError::InvalidThreshold(record.threshold));
    }

    let mut next = record.clone();
    next.signatures_collected.push(signer.clone());
    Ok(next)
}

pub fn is_complete(record: &StructuredRecord) -> bool {
    record.signatures_collected.len() as i128 >= i128::from(record.threshold)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningProgress {
    pub collected: usize,
    pub threshold: i64,
    pub total_signers: usize,
    pub missing_signers: Vec<KeyHash>,
    pub complete: bool,
}

pub fn signing_progress(record: &StructuredRecord) -> SigningProgress {
    let missing_signers = record.required_signers.iter().filter(|signer| !record.has_signed(signer)).cloned().collect();
    SigningProgress {
        collected: record.signatures_collected.len(),
        threshold: record.threshold,
        total_signers: record.required_signers.len(),
        missing_signers,
        complete: is_complete(record),
    }
}

/// Structural invariants every reachable record satisfies.
pub fn validate_record(record: &StructuredRecord) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if record.document_hash.is_empty() {
        errors.push("document_hash is empty".to_string());
    }
    if record.required_signers.is_empty() {
        errors.push("required_signers is empty".to_string());
    }
    if record.threshold < 1 || record.threshold as u64 > record.required_signers.len() as u64 {
        errors.push(format!("threshold {} outside 1..={}", record.threshold, record.required_signers.len()));
    }

    let mut seen = HashSet::new();
    for signer in &record.required_signers {
        if !seen.insert(signer.as_bytes()) {
            errors.push(format!("duplicate required signer {}", signer));
        }
    }

    let mut collected = HashSet::new();
    for signer in &record.signatures_collected {
        if !collected.insert(signer.as_bytes()) {
            errors.push(format!("duplicate collected signature {}", signer));
        }
        if !record.is_required(signer) {
            errors.push(format!("collected signature {} is not a required signer", signer));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
