//! Drives one signer through the full signing flow: validate, submit, record.

use crate::application::landing::{Landing, LedgerQueries};
use crate::application::locks::ContractLocks;
use crate::application::registry::ContractRegistry;
use crate::domain::record::{decode_record, encode_record, encode_request};
use crate::domain::{can_sign, is_complete, SubmissionIntent, TransitionRequest};
use crate::foundation::{
    now_nanos, AccordError, ContractId, ReconciliationError, RegistryError, SubmissionError, TxRef, UserId,
};
use crate::infrastructure::config::LedgerConfig;
use crate::infrastructure::ledger::{with_timeout, LedgerClient, SubmissionRequest};
use log::{debug, error, info, warn};
use std::sync::Arc;

pub struct SigningOrchestrator {
    registry: Arc<ContractRegistry>,
    ledger: Arc<dyn LedgerClient>,
    locks: Arc<ContractLocks>,
    config: LedgerConfig,
}

impl SigningOrchestrator {
    pub fn new(registry: Arc<ContractRegistry>, ledger: Arc<dyn LedgerClient>, locks: Arc<ContractLocks>, config: LedgerConfig) -> Self {
        Self { registry, ledger, locks, config }
    }

    fn queries(&self) -> LedgerQueries<'_> {
        LedgerQueries { ledger: self.ledger.as_ref(), config: &self.config }
    }

    /// Signs the contract on behalf of the user and returns the new transaction reference.
    ///
    /// Calls for one contract are serialized. Dropping the returned future before it
    /// completes never marks the row signed; a journaled submission is picked up by the
    /// next call or by the reconciler.
    pub async fn sign_contract(&self, contract_id: ContractId, user_id: UserId) -> Result<TxRef, AccordError> {
        let _guard = self.locks.acquire(contract_id).await?;
        debug!("signing started contract_id={} user_id={}", contract_id, user_id);

        let details = self.registry.get_contract(contract_id)?;
        let row = details.signers.iter().find(|row| row.user_id == user_id).ok_or(RegistryError::SignerNotFound { contract_id, user_id })?;
        if row.is_signed() {
            return Err(RegistryError::AlreadySigned { contract_id, user_id }.into());
        }
        let signer_key = self.registry.signing_key(user_id)?;

        if let Some(intent) = self.registry.storage().get_intent(contract_id)? {
            if let Some(tx_ref) = self.settle_outstanding(&intent).await? {
                if intent.user_id == user_id {
                    info!("earlier submission settled contract_id={} user_id={} tx_ref={:#x}", contract_id, user_id, tx_ref);
                    return Ok(tx_ref);
                }
            }
        }

        let previous = self.registry.latest_transaction_ref(contract_id)?;
        let current = decode_record(&self.queries().fetch_record(&previous).await?)?;
        let request = TransitionRequest::sign(signer_key.clone());
        let next = can_sign(&current, &request, std::slice::from_ref(&signer_key))?;
        let threshold_reached = is_complete(&next);
        let record = encode_record(&next);

        let mut intent = SubmissionIntent {
            contract_id,
            user_id,
            previous,
            record: record.clone(),
            created_at_nanos: now_nanos(),
            submitted: None,
            attempts: 0,
        };
        let submission = SubmissionRequest { record, redeemer: encode_request(&request), previous, signer: signer_key };
        let tx_ref = self.submit(&mut intent, submission).await?;
        self.record(&intent, tx_ref, threshold_reached)
    }

    /// Settles a journaled submission left by an interrupted call. Returns the landed
    /// reference once it is recorded; errors while it is still in flight.
    async fn settle_outstanding(&self, intent: &SubmissionIntent) -> Result<Option<TxRef>, AccordError> {
        debug!("resolving outstanding intent contract_id={} user_id={} attempts={}", intent.contract_id, intent.user_id, intent.attempts);
        match self.queries().resolve(intent).await? {
            Landing::Confirmed(tx_ref) => {
                let threshold_reached = decode_record(&intent.record).map(|record| is_complete(&record)).unwrap_or(false);
                self.record(intent, tx_ref, threshold_reached).map(Some)
            }
            Landing::Pending(tx_ref) => Err(SubmissionError::Pending { tx_ref }.into()),
            Landing::Missing => {
                self.registry.storage().clear_intent(intent.contract_id)?;
                Ok(None)
            }
            Landing::Foreign(tx_ref) => {
                self.registry.storage().clear_intent(intent.contract_id)?;
                let registry_latest = self.registry.latest_transaction_ref(intent.contract_id)?;
                error!(
                    "parent spent by unknown transaction contract_id={} previous={:#x} successor={:#x}",
                    intent.contract_id, intent.previous, tx_ref
                );
                Err(ReconciliationError::ChainDiverged { contract_id: intent.contract_id, ledger_parent: intent.previous, registry_latest }
                    .into())
            }
        }
    }

    /// Submits with bounded attempts. A submission is only repeated after the ledger
    /// confirms the previous attempt did not land.
    async fn submit(&self, intent: &mut SubmissionIntent, submission: SubmissionRequest) -> Result<TxRef, AccordError> {
        let storage = self.registry.storage();
        let mut last_err = None;
        for attempt in 1..=self.config.max_submit_attempts {
            intent.attempts = attempt;
            storage.put_intent(intent)?;
            debug!("submitting contract_id={} user_id={} attempt={}", intent.contract_id, intent.user_id, attempt);

            match with_timeout("submit", self.config.submit_timeout(), self.ledger.submit(submission.clone())).await {
                Ok(tx_ref) => {
                    intent.submitted = Some(tx_ref);
                    storage.put_intent(intent)?;
                    return Ok(tx_ref);
                }
                Err(err @ SubmissionError::Pending { .. }) => return Err(err.into()),
                Err(err @ (SubmissionError::Rejected(_) | SubmissionError::RecordNotFound(_))) => {
                    // An earlier attempt may have landed and now blocks this one.
                    if attempt > 1 {
                        match self.queries().resolve(intent).await? {
                            Landing::Confirmed(tx_ref) => return Ok(tx_ref),
                            Landing::Pending(tx_ref) => {
                                intent.submitted = Some(tx_ref);
                                storage.put_intent(intent)?;
                                warn!("earlier attempt landed unconfirmed contract_id={} tx_ref={:#x}", intent.contract_id, tx_ref);
                                return Err(SubmissionError::Pending { tx_ref }.into());
                            }
                            Landing::Foreign(tx_ref) => return Err(self.diverged(intent, tx_ref)?.into()),
                            Landing::Missing => {}
                        }
                    }
                    warn!("submission rejected contract_id={} user_id={} error={}", intent.contract_id, intent.user_id, err);
                    storage.clear_intent(intent.contract_id)?;
                    return Err(err.into());
                }
                Err(err @ (SubmissionError::Timeout { .. } | SubmissionError::Unavailable(_))) => {
                    warn!("submission outcome unknown contract_id={} user_id={} error={}", intent.contract_id, intent.user_id, err);
                    match self.queries().resolve(intent).await? {
                        Landing::Confirmed(tx_ref) => return Ok(tx_ref),
                        Landing::Pending(tx_ref) => {
                            intent.submitted = Some(tx_ref);
                            storage.put_intent(intent)?;
                            return Err(SubmissionError::Pending { tx_ref }.into());
                        }
                        Landing::Foreign(tx_ref) => return Err(self.diverged(intent, tx_ref)?.into()),
                        Landing::Missing => last_err = Some(err),
                    }
                }
            }
        }
        // The intent stays journaled: a late landing is still picked up by the reconciler.
        Err(last_err.unwrap_or_else(|| SubmissionError::Unavailable("no submission attempts configured".to_string())).into())
    }

    /// The parent was spent by a transaction we did not build. The intent stays journaled
    /// so the reconciler reports the divergence.
    fn diverged(&self, intent: &SubmissionIntent, successor: TxRef) -> Result<ReconciliationError, AccordError> {
        let registry_latest = self.registry.latest_transaction_ref(intent.contract_id)?;
        warn!("parent spent concurrently contract_id={} successor={:#x}", intent.contract_id, successor);
        Ok(ReconciliationError::ChainDiverged { contract_id: intent.contract_id, ledger_parent: intent.previous, registry_latest })
    }

    fn record(&self, intent: &SubmissionIntent, tx_ref: TxRef, threshold_reached: bool) -> Result<TxRef, AccordError> {
        match self.registry.record_signature_expecting(intent.contract_id, intent.user_id, tx_ref, intent.previous, threshold_reached) {
            Ok(_) => Ok(tx_ref),
            Err(err) => {
                error!(
                    "ledger accepted but registry write failed contract_id={} user_id={} tx_ref={:#x} error={}",
                    intent.contract_id, intent.user_id, tx_ref, err
                );
                Err(ReconciliationError::UnrecordedSignature {
                    contract_id: intent.contract_id,
                    user_id: intent.user_id,
                    tx_ref,
                    details: err.to_string(),
                }
                .into())
            }
        }
    }
}
