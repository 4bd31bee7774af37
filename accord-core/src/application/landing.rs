//! Finding out what became of a journaled submission.

use crate::domain::contract::SubmissionIntent;
use crate::foundation::{SubmissionError, TxRef};
use crate::infrastructure::config::LedgerConfig;
use crate::infrastructure::ledger::{retry, with_timeout, LedgerClient, TxStatus};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Landing {
    /// Our transaction is on the ledger and confirmed.
    Confirmed(TxRef),
    /// Our transaction is known but awaiting confirmation.
    Pending(TxRef),
    /// Nothing spent the parent; the submission did not land.
    Missing,
    /// The parent was spent by a transaction carrying a different record.
    Foreign(TxRef),
}

/// Read-only ledger queries, bounded and retried per configuration.
pub(crate) struct LedgerQueries<'a> {
    pub ledger: &'a dyn LedgerClient,
    pub config: &'a LedgerConfig,
}

impl<'a> LedgerQueries<'a> {
    pub async fn fetch_record(&self, tx_ref: &TxRef) -> Result<Vec<u8>, SubmissionError> {
        let timeout = self.config.request_timeout();
        retry(self.config.query_retries, self.config.query_retry_delay(), || {
            with_timeout("fetch_record", timeout, self.ledger.fetch_record(tx_ref))
        })
        .await
    }

    pub async fn fetch_status(&self, tx_ref: &TxRef) -> Result<TxStatus, SubmissionError> {
        let timeout = self.config.request_timeout();
        retry(self.config.query_retries, self.config.query_retry_delay(), || {
            with_timeout("fetch_status", timeout, self.ledger.fetch_status(tx_ref))
        })
        .await
    }

    pub async fn find_successor(&self, previous: &TxRef) -> Result<Option<TxRef>, SubmissionError> {
        let timeout = self.config.request_timeout();
        retry(self.config.query_retries, self.config.query_retry_delay(), || {
            with_timeout("find_successor", timeout, self.ledger.find_successor(previous))
        })
        .await
    }

    /// Resolves the journaled submission by asking the ledger, never by resubmitting.
    pub async fn resolve(&self, intent: &SubmissionIntent) -> Result<Landing, SubmissionError> {
        let candidate = match intent.submitted {
            Some(tx_ref) => Some(tx_ref),
            None => self.find_successor(&intent.previous).await?,
        };
        let Some(tx_ref) = candidate else {
            debug!("no successor on ledger contract_id={} previous={:#x}", intent.contract_id, intent.previous);
            return Ok(Landing::Missing);
        };

        if intent.submitted.is_none() {
            let landed = match self.fetch_record(&tx_ref).await {
                Ok(record) => record,
                Err(SubmissionError::RecordNotFound(_)) => return Ok(Landing::Pending(tx_ref)),
                Err(err) => return Err(err),
            };
            if landed != intent.record {
                return Ok(Landing::Foreign(tx_ref));
            }
        }

        let landing = match self.fetch_status(&tx_ref).await? {
            TxStatus::Confirmed => Landing::Confirmed(tx_ref),
            TxStatus::Pending => Landing::Pending(tx_ref),
            TxStatus::NotFound if intent.submitted.is_some() => Landing::Missing,
            // A successor was reported, so the status lookup is lagging.
            TxStatus::NotFound => Landing::Pending(tx_ref),
        };
        debug!("submission resolved contract_id={} user_id={} landing={:?}", intent.contract_id, intent.user_id, landing);
        Ok(landing)
    }
}
