use super::RocksStorage;
use crate::domain::SubmissionIntent;
use crate::foundation::{AccordError, ContractId, RegistryError};
use crate::infrastructure::storage::rocks::schema::*;
use crate::infrastructure::storage::rocks::util::lock_bounded;
use log::debug;

impl RocksStorage {
    pub(super) fn journal_put(&self, intent: &SubmissionIntent) -> Result<(), AccordError> {
        let lock = self.contract_lock(intent.contract_id)?;
        let _guard = lock_bounded(&lock, "rocks contract lock")?;
        if self.load_contract(intent.contract_id)?.is_none() {
            return Err(RegistryError::ContractNotFound(intent.contract_id).into());
        }
        debug!(
            "intent journaled contract_id={} user_id={} previous={:#x} attempts={}",
            intent.contract_id, intent.user_id, intent.previous, intent.attempts
        );
        let cf = self.cf_handle(CF_INTENT)?;
        self.db.put_cf(cf, Self::key_intent(intent.contract_id), Self::encode(intent)?).map_err(AccordError::from)
    }

    pub(super) fn journal_get(&self, contract_id: ContractId) -> Result<Option<SubmissionIntent>, AccordError> {
        self.get_value(CF_INTENT, &Self::key_intent(contract_id))
    }

    pub(super) fn journal_clear(&self, contract_id: ContractId) -> Result<bool, AccordError> {
        let lock = self.contract_lock(contract_id)?;
        let _guard = lock_bounded(&lock, "rocks contract lock")?;
        let key = Self::key_intent(contract_id);
        let cf = self.cf_handle(CF_INTENT)?;
        let existed = self.db.get_cf(cf, &key).map_err(|err| crate::storage_err!("rocksdb get_cf intent", err))?.is_some();
        if existed {
            self.db.delete_cf(cf, &key).map_err(AccordError::from)?;
            debug!("intent cleared contract_id={}", contract_id);
        }
        Ok(existed)
    }

    pub(super) fn journal_list(&self) -> Result<Vec<SubmissionIntent>, AccordError> {
        Ok(self.scan_prefix(CF_INTENT, PREFIX_INTENT)?.into_iter().map(|(_, intent)| intent).collect())
    }
}
