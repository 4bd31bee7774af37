use crate::foundation::SubmissionError;
use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retries an idempotent ledger query with a fixed delay.
///
/// Only transient failures are retried. Never wrap `submit` in this: a submission whose
/// outcome is unknown must be resolved by querying the ledger.
pub async fn retry<F, Fut, T>(mut attempts: usize, delay: Duration, mut op: F) -> Result<T, SubmissionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SubmissionError>>,
{
    let mut last_err = None;
    while attempts > 0 {
        match op().await {
            Ok(v) => return Ok(v),
            Err(err @ (SubmissionError::Timeout { .. } | SubmissionError::Unavailable(_))) => {
                debug!("ledger query failed, retrying attempts_left={} error={}", attempts - 1, err);
                last_err = Some(err);
                attempts -= 1;
                if attempts > 0 {
                    sleep(delay).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| SubmissionError::Unavailable("retry exhausted".to_string())))
}

/// Bounds a ledger call; elapsed time becomes `SubmissionError::Timeout`.
pub async fn with_timeout<Fut, T>(operation: &'static str, timeout: Duration, fut: Fut) -> Result<T, SubmissionError>
where
    Fut: Future<Output = Result<T, SubmissionError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(SubmissionError::Timeout { operation, timeout_ms: timeout.as_millis() as u64 }),
    }
}
