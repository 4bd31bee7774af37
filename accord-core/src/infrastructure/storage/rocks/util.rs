use crate::foundation::{AccordError, STORAGE_LOCK_TIMEOUT_SECS};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

const LOCK_POLL: Duration = Duration::from_millis(10);

/// Locks a storage mutex, giving up after `STORAGE_LOCK_TIMEOUT_SECS`.
pub fn lock_bounded<'a, T>(lock: &'a Mutex<T>, operation: &'static str) -> Result<MutexGuard<'a, T>, AccordError> {
    lock_within(lock, operation, Duration::from_secs(STORAGE_LOCK_TIMEOUT_SECS))
}

pub fn lock_within<'a, T>(lock: &'a Mutex<T>, operation: &'static str, limit: Duration) -> Result<MutexGuard<'a, T>, AccordError> {
    let deadline = Instant::now() + limit;
    loop {
        let blocked = match lock.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => false,
        };
        if !blocked {
            return Err(AccordError::StorageError { operation: operation.to_string(), details: "lock poisoned by a panicked writer".to_string() });
        }
        if Instant::now() >= deadline {
            return Err(AccordError::StorageLockTimeout { operation: operation.to_string(), timeout_secs: limit.as_secs() });
        }
        std::thread::sleep(LOCK_POLL);
    }
}
