use crate::foundation::{ContractId, KeyHash, SignerRowId, TxRef, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    /// PHC-format one-way hash; the plaintext is never stored.
    pub password_hash: String,
    pub wallet_address: Option<String>,
    pub key_hash: Option<KeyHash>,
    pub created_at_nanos: u64,
    pub updated_at_nanos: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractStatus {
    Draft,
    Pending,
    Signed,
    Completed,
}

impl ContractStatus {
    fn rank(self) -> u8 {
        match self {
            ContractStatus::Draft => 0,
            ContractStatus::Pending => 1,
            ContractStatus::Signed => 2,
            ContractStatus::Completed => 3,
        }
    }

    /// Status only ever moves forward; a lower target keeps the current one.
    pub fn advance_to(self, target: ContractStatus) -> ContractStatus {
        if target.rank() > self.rank() {
            target
        } else {
            self
        }
    }

    /// Status implied by the signer rows after a signature lands.
    pub fn after_signature(self, signed_rows: usize, total_rows: usize, threshold_reached: bool) -> ContractStatus {
        let derived = if total_rows > 0 && signed_rows >= total_rows {
            ContractStatus::Completed
        } else if threshold_reached {
            ContractStatus::Signed
        } else if signed_rows > 0 {
            ContractStatus::Pending
        } else {
            ContractStatus::Draft
        };
        self.advance_to(derived)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Pending => "pending",
            ContractStatus::Signed => "signed",
            ContractStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = crate::foundation::AccordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ContractStatus::Draft),
            "pending" => Ok(ContractStatus::Pending),
            "signed" => Ok(ContractStatus::Signed),
            "completed" => Ok(ContractStatus::Completed),
            other => Err(crate::foundation::AccordError::ParseError(format!("unknown contract status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub name: String,
    pub description: Option<String>,
    pub contract_type: String,
    /// Opaque handle into external document storage.
    pub document_ref: String,
    pub genesis_tx_ref: TxRef,
    pub creator_id: UserId,
    pub status: ContractStatus,
    pub created_at_nanos: u64,
    pub updated_at_nanos: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignerStatus {
    Pending,
    Signed,
}

impl fmt::Display for SignerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerStatus::Pending => f.write_str("pending"),
            SignerStatus::Signed => f.write_str("signed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSigner {
    /// Allocated in insertion order; breaks `signed_at` ties.
    pub id: SignerRowId,
    pub contract_id: ContractId,
    pub user_id: UserId,
    pub status: SignerStatus,
    pub signed_at_nanos: Option<u64>,
    pub tx_ref: Option<TxRef>,
    pub parent_tx_ref: Option<TxRef>,
    pub created_at_nanos: u64,
}

impl ContractSigner {
    pub fn pending(id: SignerRowId, contract_id: ContractId, user_id: UserId, now_nanos: u64) -> Self {
        Self {
            id,
            contract_id,
            user_id,
            status: SignerStatus::Pending,
            signed_at_nanos: None,
            tx_ref: None,
            parent_tx_ref: None,
            created_at_nanos: now_nanos,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.status == SignerStatus::Signed
    }

    /// Flips the row to signed. Callers hold the contract's write lock.
    pub fn mark_signed(&mut self, tx_ref: TxRef, parent_tx_ref: TxRef, now_nanos: u64) {
        self.status = SignerStatus::Signed;
        self.signed_at_nanos = Some(now_nanos);
        self.tx_ref = Some(tx_ref);
        self.parent_tx_ref = Some(parent_tx_ref);
    }
}

/// Journal entry covering a ledger submission whose outcome the registry has not recorded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionIntent {
    pub contract_id: ContractId,
    pub user_id: UserId,
    /// Reference the submission was built against.
    pub previous: TxRef,
    pub record: Vec<u8>,
    pub created_at_nanos: u64,
    pub submitted: Option<TxRef>,
    pub attempts: u32,
}

impl SubmissionIntent {
    pub fn age_nanos(&self, now_nanos: u64) -> u64 {
        now_nanos.saturating_sub(self.created_at_nanos)
    }
}

/// Input to contract creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDraft {
    pub name: String,
    pub description: Option<String>,
    pub contract_type: String,
    pub document_ref: String,
    pub genesis_tx_ref: TxRef,
    pub creator_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInvite {
    pub email: String,
    pub name: Option<String>,
}

impl SignerInvite {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into(), name: None }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
