//! Ledger collaborator: the only path to the authoritative record.

use crate::foundation::{KeyHash, SubmissionError, TxRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod retry;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockLedger, SubmitFault};
pub use retry::{retry, with_timeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Confirmed,
    Pending,
    NotFound,
}

/// A signing transaction spending `previous` into a new output carrying `record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub record: Vec<u8>,
    pub redeemer: Vec<u8>,
    pub previous: TxRef,
    /// Required co-signer of the transaction.
    pub signer: KeyHash,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Encoded record attached to the contract output created by `tx_ref`.
    async fn fetch_record(&self, tx_ref: &TxRef) -> Result<Vec<u8>, SubmissionError>;
    async fn submit(&self, request: SubmissionRequest) -> Result<TxRef, SubmissionError>;
    async fn fetch_status(&self, tx_ref: &TxRef) -> Result<TxStatus, SubmissionError>;
    /// Transaction that spent the contract output created by `previous`, if any.
    async fn find_successor(&self, previous: &TxRef) -> Result<Option<TxRef>, SubmissionError>;
}
