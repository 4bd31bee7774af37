use crate::foundation::{hx, DocumentHash, KeyHash, SIGN_CONTRACT_ACTION};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger-resident signing state of one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub document_hash: DocumentHash,
    pub required_signers: Vec<KeyHash>,
    pub signatures_collected: Vec<KeyHash>,
    /// Kept signed so out-of-range values survive decoding and reach the validator.
    pub threshold: i64,
    pub creator: KeyHash,
}

impl StructuredRecord {
    /// Genesis record: nobody has signed yet.
    pub fn genesis(document_hash: DocumentHash, required_signers: Vec<KeyHash>, threshold: i64, creator: KeyHash) -> Self {
        Self { document_hash, required_signers, signatures_collected: Vec::new(), threshold, creator }
    }

    pub fn has_signed(&self, signer: &KeyHash) -> bool {
        self.signatures_collected.iter().any(|collected| collected == signer)
    }

    pub fn is_required(&self, signer: &KeyHash) -> bool {
        self.required_signers.iter().any(|required| required == signer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionAction {
    SignContract,
    /// Unrecognized action bytes, kept for diagnostics.
    Unknown(Vec<u8>),
}

impl TransitionAction {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes == SIGN_CONTRACT_ACTION {
            TransitionAction::SignContract
        } else {
            TransitionAction::Unknown(bytes.to_vec())
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TransitionAction::SignContract => SIGN_CONTRACT_ACTION,
            TransitionAction::Unknown(bytes) => bytes,
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(self.as_bytes()) {
            Ok(text) => f.write_str(text),
            Err(_) => write!(f, "{:#x}", hx(self.as_bytes())),
        }
    }
}

/// The redeemer of a signing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub action: TransitionAction,
    pub signer: KeyHash,
}

impl TransitionRequest {
    pub fn sign(signer: KeyHash) -> Self {
        Self { action: TransitionAction::SignContract, signer }
    }
}
