use crate::foundation::{AccordError, ContractId};
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-contract exclusivity for the whole signing flow, held across ledger awaits.
///
/// Different contracts never contend. The guard releases on drop, including when the
/// owning future is cancelled.
pub struct ContractLocks {
    locks: Mutex<HashMap<ContractId, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

pub type ContractGuard = OwnedMutexGuard<()>;

impl ContractLocks {
    pub fn new(timeout: Duration) -> Self {
        Self { locks: Mutex::new(HashMap::new()), timeout }
    }

    pub async fn acquire(&self, contract_id: ContractId) -> Result<ContractGuard, AccordError> {
        let lock = self.locks.lock().entry(contract_id).or_default().clone();
        trace!("waiting for contract lock contract_id={} timeout_ms={}", contract_id, self.timeout.as_millis());
        tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| AccordError::LockTimeout { contract_id, timeout_ms: self.timeout.as_millis() as u64 })
    }

    /// Non-blocking variant for background sweeps.
    pub fn try_acquire(&self, contract_id: ContractId) -> Option<ContractGuard> {
        let lock = self.locks.lock().entry(contract_id).or_default().clone();
        lock.try_lock_owned().ok()
    }

    /// Drops idle entries so the table does not grow with every contract ever signed.
    pub fn prune(&self) {
        self.locks.lock().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
