//! Background repair of submissions the registry never recorded.

use crate::application::landing::{Landing, LedgerQueries};
use crate::application::locks::ContractLocks;
use crate::application::registry::ContractRegistry;
use crate::domain::is_complete;
use crate::domain::record::decode_record;
use crate::domain::SubmissionIntent;
use crate::foundation::{now_nanos, AccordError, ContractId, RegistryError, TxRef, UserId, NANOS_PER_SECOND};
use crate::infrastructure::config::{LedgerConfig, ReconciliationConfig};
use crate::infrastructure::ledger::LedgerClient;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    /// Younger than the confirmation latency.
    pub skipped_fresh: usize,
    /// Contract locked by an in-flight signing call.
    pub skipped_busy: usize,
    pub recorded: Vec<(ContractId, UserId, TxRef)>,
    pub already_reflected: usize,
    pub pending: usize,
    pub abandoned: usize,
    pub diverged: Vec<ContractId>,
    pub failed: Vec<(ContractId, String)>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.diverged.is_empty() && self.failed.is_empty()
    }
}

enum Outcome {
    Recorded(TxRef),
    AlreadyReflected,
    Pending,
    Abandoned,
    Diverged,
}

pub struct Reconciler {
    registry: Arc<ContractRegistry>,
    ledger: Arc<dyn LedgerClient>,
    locks: Arc<ContractLocks>,
    ledger_config: LedgerConfig,
    config: ReconciliationConfig,
}

impl Reconciler {
    pub fn new(
        registry: Arc<ContractRegistry>,
        ledger: Arc<dyn LedgerClient>,
        locks: Arc<ContractLocks>,
        ledger_config: LedgerConfig,
        config: ReconciliationConfig,
    ) -> Self {
        Self { registry, ledger, locks, ledger_config, config }
    }

    /// One sweep over the journal. Failures on one intent do not stop the sweep.
    pub async fn reconcile_once(&self) -> Result<ReconcileReport, AccordError> {
        let now = now_nanos();
        let latency = self.config.confirmation_latency_secs.saturating_mul(NANOS_PER_SECOND);
        let mut report = ReconcileReport::default();

        for intent in self.registry.storage().list_intents()? {
            report.scanned += 1;
            if intent.age_nanos(now) < latency {
                report.skipped_fresh += 1;
                continue;
            }
            let Some(_guard) = self.locks.try_acquire(intent.contract_id) else {
                report.skipped_busy += 1;
                continue;
            };
            // Re-read under the lock; a signing call may have settled it meanwhile.
            let Some(intent) = self.registry.storage().get_intent(intent.contract_id)? else {
                continue;
            };

            match self.reconcile_intent(&intent, now).await {
                Ok(Outcome::Recorded(tx_ref)) => report.recorded.push((intent.contract_id, intent.user_id, tx_ref)),
                Ok(Outcome::AlreadyReflected) => report.already_reflected += 1,
                Ok(Outcome::Pending) => report.pending += 1,
                Ok(Outcome::Abandoned) => report.abandoned += 1,
                Ok(Outcome::Diverged) => report.diverged.push(intent.contract_id),
                Err(err) => {
                    warn!("reconcile failed contract_id={} user_id={} error={}", intent.contract_id, intent.user_id, err);
                    report.failed.push((intent.contract_id, err.to_string()));
                }
            }
        }

        self.locks.prune();
        if report.scanned > 0 {
            info!(
                "reconcile sweep scanned={} recorded={} reflected={} pending={} abandoned={} diverged={} failed={}",
                report.scanned,
                report.recorded.len(),
                report.already_reflected,
                report.pending,
                report.abandoned,
                report.diverged.len(),
                report.failed.len()
            );
        }
        Ok(report)
    }

    async fn reconcile_intent(&self, intent: &SubmissionIntent, now: u64) -> Result<Outcome, AccordError> {
        let storage = self.registry.storage();
        let Some(row) = storage.get_signer(intent.contract_id, intent.user_id)? else {
            storage.clear_intent(intent.contract_id)?;
            return Ok(Outcome::AlreadyReflected);
        };
        if row.is_signed() {
            storage.clear_intent(intent.contract_id)?;
            return Ok(Outcome::AlreadyReflected);
        }

        let queries = LedgerQueries { ledger: self.ledger.as_ref(), config: &self.ledger_config };
        match queries.resolve(intent).await? {
            Landing::Confirmed(tx_ref) => {
                let threshold_reached = decode_record(&intent.record).map(|record| is_complete(&record)).unwrap_or(false);
                match self.registry.record_signature_expecting(intent.contract_id, intent.user_id, tx_ref, intent.previous, threshold_reached) {
                    Ok(_) => {
                        info!("repaired signature contract_id={} user_id={} tx_ref={:#x}", intent.contract_id, intent.user_id, tx_ref);
                        Ok(Outcome::Recorded(tx_ref))
                    }
                    Err(AccordError::Registry(RegistryError::ChainConflict { expected, actual, .. })) => {
                        error!(
                            "journaled parent no longer latest contract_id={} parent={:#x} latest={:#x}",
                            intent.contract_id, expected, actual
                        );
                        Ok(Outcome::Diverged)
                    }
                    Err(err) => Err(err),
                }
            }
            Landing::Pending(tx_ref) => {
                debug!("submission still pending contract_id={} tx_ref={:#x}", intent.contract_id, tx_ref);
                Ok(Outcome::Pending)
            }
            Landing::Missing => {
                let abandon_after = self.config.abandon_after_secs.saturating_mul(NANOS_PER_SECOND);
                if intent.age_nanos(now) >= abandon_after {
                    warn!("abandoning submission contract_id={} user_id={} attempts={}", intent.contract_id, intent.user_id, intent.attempts);
                    storage.clear_intent(intent.contract_id)?;
                    Ok(Outcome::Abandoned)
                } else {
                    Ok(Outcome::Pending)
                }
            }
            Landing::Foreign(tx_ref) => {
                error!("parent spent by unknown transaction contract_id={} successor={:#x}", intent.contract_id, tx_ref);
                storage.clear_intent(intent.contract_id)?;
                Ok(Outcome::Diverged)
            }
        }
    }

    /// Sweeps on the configured interval until `shutdown` flips to true or its sender drops.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let interval_secs = self.config.interval_secs.max(1);
        info!("reconciler started interval_secs={}", interval_secs);
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.reconcile_once().await {
                        error!("reconcile sweep failed error={}", err);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("reconciler stopped");
    }
}
