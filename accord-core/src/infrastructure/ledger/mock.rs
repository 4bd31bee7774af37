//! In-process ledger for tests: a UTXO chain per contract with the signing script applied
//! on every submission.

use super::{LedgerClient, SubmissionRequest, TxStatus};
use crate::domain::record::{decode_record, decode_request};
use crate::domain::can_sign;
use crate::foundation::{SubmissionError, TxRef};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Failure injected into the next `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFault {
    Reject(String),
    Unavailable,
    /// The transaction is applied but the caller sees a timeout.
    TimeoutAfterAccept,
    /// The caller sees a timeout and nothing reaches the ledger.
    TimeoutBeforeAccept,
    /// Sleep before applying, so the caller can be cancelled mid-flight.
    Delay(Duration),
}

#[derive(Default)]
struct MockInner {
    records: HashMap<TxRef, Vec<u8>>,
    status: HashMap<TxRef, TxStatus>,
    /// previous output -> transaction that spent it
    spent_by: HashMap<TxRef, TxRef>,
    submissions: Vec<SubmissionRequest>,
    faults: VecDeque<SubmitFault>,
    new_status: Option<TxStatus>,
    /// successor lookups still answered as if the index had not caught up
    stale_successor_lookups: u32,
}

pub struct MockLedger {
    inner: Mutex<MockInner>,
    submit_calls: AtomicU64,
    fetch_calls: AtomicU64,
}

impl MockLedger {
    pub fn new() -> Self {
        Self { inner: Mutex::new(MockInner::default()), submit_calls: AtomicU64::new(0), fetch_calls: AtomicU64::new(0) }
    }

    /// Places a confirmed genesis output carrying `record` and returns its reference.
    pub fn insert_genesis(&self, record: Vec<u8>) -> TxRef {
        let tx_ref = TxRef::new(*blake3::hash(&record).as_bytes());
        let mut inner = self.inner.lock();
        inner.records.insert(tx_ref, record);
        inner.status.insert(tx_ref, TxStatus::Confirmed);
        tx_ref
    }

    pub fn push_fault(&self, fault: SubmitFault) {
        self.inner.lock().faults.push_back(fault);
    }

    /// Status reported for transactions accepted from now on. Defaults to confirmed.
    pub fn set_new_status(&self, status: TxStatus) {
        self.inner.lock().new_status = Some(status);
    }

    /// The next `count` successor lookups report no spend, like an indexer that lags the chain.
    pub fn lag_successor_lookups(&self, count: u32) {
        self.inner.lock().stale_successor_lookups = count;
    }

    /// Spends `previous` directly with `record`, bypassing the signing script.
    pub fn spend_outside(&self, previous: TxRef, record: Vec<u8>) -> TxRef {
        let mut hasher = blake3::Hasher::new();
        hasher.update(previous.as_hash());
        hasher.update(b"outside");
        hasher.update(&record);
        let tx_ref = TxRef::new(*hasher.finalize().as_bytes());
        let mut inner = self.inner.lock();
        inner.spent_by.insert(previous, tx_ref);
        inner.records.insert(tx_ref, record);
        inner.status.insert(tx_ref, TxStatus::Confirmed);
        tx_ref
    }

    pub fn set_status(&self, tx_ref: TxRef, status: TxStatus) {
        self.inner.lock().status.insert(tx_ref, status);
    }

    pub fn submissions(&self) -> Vec<SubmissionRequest> {
        self.inner.lock().submissions.clone()
    }

    pub fn successor_of(&self, previous: &TxRef) -> Option<TxRef> {
        self.inner.lock().spent_by.get(previous).copied()
    }

    pub fn record_at(&self, tx_ref: &TxRef) -> Option<Vec<u8>> {
        self.inner.lock().records.get(tx_ref).cloned()
    }

    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::Relaxed)
    }

    pub fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::Relaxed)
    }

    fn transaction_id(request: &SubmissionRequest) -> TxRef {
        let mut hasher = blake3::Hasher::new();
        hasher.update(request.previous.as_hash());
        hasher.update(&request.record);
        hasher.update(&request.redeemer);
        TxRef::new(*hasher.finalize().as_bytes())
    }

    /// Runs the signing script against the spent output and the proposed one.
    fn apply(&self, request: SubmissionRequest) -> Result<TxRef, SubmissionError> {
        let mut inner = self.inner.lock();
        let current = inner.records.get(&request.previous).ok_or(SubmissionError::RecordNotFound(request.previous))?;
        if inner.spent_by.contains_key(&request.previous) {
            return Err(SubmissionError::Rejected(format!("output {} already spent", request.previous)));
        }
        let current = decode_record(current).map_err(|err| SubmissionError::Rejected(format!("spent datum: {}", err)))?;
        let proposed = decode_record(&request.record).map_err(|err| SubmissionError::Rejected(format!("new datum: {}", err)))?;
        let redeemer = decode_request(&request.redeemer).map_err(|err| SubmissionError::Rejected(format!("redeemer: {}", err)))?;
        let expected = can_sign(&current, &redeemer, std::slice::from_ref(&request.signer))
            .map_err(|err| SubmissionError::Rejected(err.to_string()))?;
        if expected != proposed {
            return Err(SubmissionError::Rejected("output datum does not match signing transition".to_string()));
        }

        let tx_ref = Self::transaction_id(&request);
        let status = inner.new_status.unwrap_or(TxStatus::Confirmed);
        inner.spent_by.insert(request.previous, tx_ref);
        inner.records.insert(tx_ref, request.record.clone());
        inner.status.insert(tx_ref, status);
        inner.submissions.push(request);
        Ok(tx_ref)
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn fetch_record(&self, tx_ref: &TxRef) -> Result<Vec<u8>, SubmissionError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().records.get(tx_ref).cloned().ok_or(SubmissionError::RecordNotFound(*tx_ref))
    }

    async fn submit(&self, request: SubmissionRequest) -> Result<TxRef, SubmissionError> {
        self.submit_calls.fetch_add(1, Ordering::Relaxed);
        let fault = self.inner.lock().faults.pop_front();
        match fault {
            None => self.apply(request),
            Some(SubmitFault::Reject(reason)) => Err(SubmissionError::Rejected(reason)),
            Some(SubmitFault::Unavailable) => Err(SubmissionError::Unavailable("mock ledger offline".to_string())),
            Some(SubmitFault::TimeoutBeforeAccept) => Err(SubmissionError::Timeout { operation: "submit", timeout_ms: 0 }),
            Some(SubmitFault::TimeoutAfterAccept) => {
                self.apply(request)?;
                Err(SubmissionError::Timeout { operation: "submit", timeout_ms: 0 })
            }
            Some(SubmitFault::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                self.apply(request)
            }
        }
    }

    async fn fetch_status(&self, tx_ref: &TxRef) -> Result<TxStatus, SubmissionError> {
        Ok(self.inner.lock().status.get(tx_ref).copied().unwrap_or(TxStatus::NotFound))
    }

    async fn find_successor(&self, previous: &TxRef) -> Result<Option<TxRef>, SubmissionError> {
        let mut inner = self.inner.lock();
        if inner.stale_successor_lookups > 0 {
            inner.stale_successor_lookups -= 1;
            return Ok(None);
        }
        Ok(inner.spent_by.get(previous).copied())
    }
}
