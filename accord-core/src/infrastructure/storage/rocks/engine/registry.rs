use super::batch::RocksBatch;
use super::{IdAllocator, RocksStorage};
use crate::domain::contract::normalize_email;
use crate::domain::{Contract, ContractSigner, ContractStatus, SignerStatus, SubmissionIntent, User};
use crate::foundation::{AccordError, ContractId, RegistryError, TxRef, UserId};
use crate::infrastructure::storage::rocks::schema::*;
use crate::infrastructure::storage::rocks::util::lock_bounded;
use crate::infrastructure::storage::rules::apply_signature;
use crate::infrastructure::storage::{
    AddedSigner, ContractCreation, CreatedContract, NewUser, RegistryStorage, SignatureOutcome, SignatureWrite, SignerSlot,
};
use log::{debug, info, trace};

impl RocksStorage {
    fn user_from_new(ids: &mut IdAllocator, new_user: NewUser) -> User {
        User {
            id: ids.user_id(),
            email: normalize_email(&new_user.email),
            name: new_user.name,
            password_hash: new_user.password_hash,
            wallet_address: None,
            key_hash: None,
            created_at_nanos: new_user.created_at_nanos,
            updated_at_nanos: new_user.created_at_nanos,
        }
    }

    fn put_signer(&self, batch: &mut RocksBatch<'_>, row: &ContractSigner) -> Result<(), AccordError> {
        let value = Self::encode(row)?;
        batch.put(self.cf_handle(CF_SIGNER)?, &Self::key_signer(row.contract_id, row.id), &value);
        Ok(())
    }
}

impl RegistryStorage for RocksStorage {
    fn create_contract(&self, creation: ContractCreation) -> Result<CreatedContract, AccordError> {
        let _index = lock_bounded(&self.index_lock, "rocks index lock")?;
        let ContractCreation { draft, slots, now_nanos } = creation;

        if self.get_value::<ContractId>(CF_CONTRACT_INDEX, &Self::key_genesis(&draft.genesis_tx_ref))?.is_some() {
            return Err(RegistryError::DuplicateGenesis(draft.genesis_tx_ref).into());
        }
        if self.load_user(draft.creator_id)?.is_none() {
            return Err(RegistryError::UserNotFound(draft.creator_id).into());
        }
        for slot in &slots {
            match slot {
                SignerSlot::Existing(user_id) => {
                    if self.load_user(*user_id)?.is_none() {
                        return Err(RegistryError::UserNotFound(*user_id).into());
                    }
                }
                SignerSlot::Provision(new_user) => {
                    if self.lookup_email(&normalize_email(&new_user.email))?.is_some() {
                        return Err(RegistryError::DuplicateEmail { email: normalize_email(&new_user.email) }.into());
                    }
                }
            }
        }

        let mut ids = IdAllocator::load(self)?;
        let contract_id = ids.contract_id();
        let contract = Contract {
            id: contract_id,
            name: draft.name,
            description: draft.description,
            contract_type: draft.contract_type,
            document_ref: draft.document_ref,
            genesis_tx_ref: draft.genesis_tx_ref,
            creator_id: draft.creator_id,
            status: ContractStatus::Draft,
            created_at_nanos: now_nanos,
            updated_at_nanos: now_nanos,
        };

        let mut batch = RocksBatch::new(&self.db);
        let cf_user = self.cf_handle(CF_USER)?;
        let cf_user_index = self.cf_handle(CF_USER_INDEX)?;
        let cf_contract_index = self.cf_handle(CF_CONTRACT_INDEX)?;

        let mut provisioned = Vec::new();
        let mut signers: Vec<ContractSigner> = Vec::with_capacity(slots.len());
        for slot in slots {
            let user_id = match slot {
                SignerSlot::Existing(user_id) => user_id,
                SignerSlot::Provision(new_user) => {
                    let user = Self::user_from_new(&mut ids, new_user);
                    batch.put(cf_user, &Self::key_user(user.id), &Self::encode(&user)?);
                    batch.put(cf_user_index, &Self::key_email(&user.email), &Self::encode(&user.id)?);
                    let id = user.id;
                    provisioned.push(user);
                    id
                }
            };
            if signers.iter().any(|row| row.user_id == user_id) {
                continue;
            }
            let row = ContractSigner::pending(ids.signer_row_id(), contract_id, user_id, now_nanos);
            self.put_signer(&mut batch, &row)?;
            batch.put(cf_contract_index, &Self::key_user_contract(user_id, contract_id), &[]);
            signers.push(row);
        }

        batch.put(self.cf_handle(CF_CONTRACT)?, &Self::key_contract(contract_id), &Self::encode(&contract)?);
        batch.put(cf_contract_index, &Self::key_genesis(&contract.genesis_tx_ref), &Self::encode(&contract_id)?);
        ids.persist(&mut batch, self.cf_handle(CF_METADATA)?);
        let writes = batch.len();
        batch.commit()?;
        info!(
            "contract created contract_id={} genesis_tx_ref={:#x} signers={} provisioned={} writes={}",
            contract_id,
            contract.genesis_tx_ref,
            signers.len(),
            provisioned.len(),
            writes
        );
        Ok(CreatedContract { contract, signers, provisioned })
    }

    fn get_contract(&self, contract_id: ContractId) -> Result<Option<Contract>, AccordError> {
        trace!("get_contract contract_id={}", contract_id);
        self.load_contract(contract_id)
    }

    fn find_contract_by_genesis(&self, genesis_tx_ref: &TxRef) -> Result<Option<Contract>, AccordError> {
        trace!("find_contract_by_genesis genesis_tx_ref={:#x}", genesis_tx_ref);
        match self.get_value::<ContractId>(CF_CONTRACT_INDEX, &Self::key_genesis(genesis_tx_ref))? {
            Some(contract_id) => self.load_contract(contract_id),
            None => Ok(None),
        }
    }

    fn list_contracts(&self) -> Result<Vec<Contract>, AccordError> {
        Ok(self.scan_prefix(CF_CONTRACT, PREFIX_CONTRACT)?.into_iter().map(|(_, contract)| contract).collect())
    }

    fn delete_contract(&self, contract_id: ContractId) -> Result<bool, AccordError> {
        let lock = self.contract_lock(contract_id)?;
        let guard = lock_bounded(&lock, "rocks contract lock")?;
        let Some(contract) = self.load_contract(contract_id)? else {
            return Ok(false);
        };
        let signers = self.load_signers(contract_id)?;

        let mut batch = RocksBatch::new(&self.db);
        let cf_signer = self.cf_handle(CF_SIGNER)?;
        let cf_contract_index = self.cf_handle(CF_CONTRACT_INDEX)?;
        for row in &signers {
            batch.delete(cf_signer, &Self::key_signer(contract_id, row.id));
            batch.delete(cf_contract_index, &Self::key_user_contract(row.user_id, contract_id));
        }
        batch.delete(cf_contract_index, &Self::key_genesis(&contract.genesis_tx_ref));
        batch.delete(self.cf_handle(CF_INTENT)?, &Self::key_intent(contract_id));
        batch.delete(self.cf_handle(CF_CONTRACT)?, &Self::key_contract(contract_id));
        batch.commit()?;
        drop(guard);
        self.forget_contract_lock(contract_id)?;
        info!("contract deleted contract_id={} signer_rows={}", contract_id, signers.len());
        Ok(true)
    }

    fn advance_contract_status(&self, contract_id: ContractId, status: ContractStatus, now_nanos: u64) -> Result<Contract, AccordError> {
        let lock = self.contract_lock(contract_id)?;
        let _guard = lock_bounded(&lock, "rocks contract lock")?;
        let mut contract = self.load_contract(contract_id)?.ok_or(RegistryError::ContractNotFound(contract_id))?;
        let next = contract.status.advance_to(status);
        if next != contract.status {
            debug!("contract status advanced contract_id={} from={} to={}", contract_id, contract.status, next);
            contract.status = next;
            contract.updated_at_nanos = now_nanos;
            let cf = self.cf_handle(CF_CONTRACT)?;
            self.db.put_cf(cf, Self::key_contract(contract_id), Self::encode(&contract)?).map_err(AccordError::from)?;
        }
        Ok(contract)
    }

    fn insert_user(&self, new_user: NewUser) -> Result<User, AccordError> {
        let _index = lock_bounded(&self.index_lock, "rocks index lock")?;
        let email = normalize_email(&new_user.email);
        if self.lookup_email(&email)?.is_some() {
            return Err(RegistryError::DuplicateEmail { email }.into());
        }
        let mut ids = IdAllocator::load(self)?;
        let user = Self::user_from_new(&mut ids, new_user);

        let mut batch = RocksBatch::new(&self.db);
        batch.put(self.cf_handle(CF_USER)?, &Self::key_user(user.id), &Self::encode(&user)?);
        batch.put(self.cf_handle(CF_USER_INDEX)?, &Self::key_email(&user.email), &Self::encode(&user.id)?);
        ids.persist(&mut batch, self.cf_handle(CF_METADATA)?);
        batch.commit()?;
        debug!("user inserted user_id={}", user.id);
        Ok(user)
    }

    fn get_user(&self, user_id: UserId) -> Result<Option<User>, AccordError> {
        self.load_user(user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AccordError> {
        match self.lookup_email(&normalize_email(email))? {
            Some(user_id) => self.load_user(user_id),
            None => Ok(None),
        }
    }

    fn update_user(&self, user: &User) -> Result<(), AccordError> {
        let _index = lock_bounded(&self.index_lock, "rocks index lock")?;
        let existing = self.load_user(user.id)?.ok_or(RegistryError::UserNotFound(user.id))?;
        if normalize_email(&existing.email) != normalize_email(&user.email) {
            return Err(AccordError::StorageError { operation: "update_user".to_string(), details: "email is immutable".to_string() });
        }
        let cf = self.cf_handle(CF_USER)?;
        self.db.put_cf(cf, Self::key_user(user.id), Self::encode(user)?).map_err(AccordError::from)
    }

    fn list_signers(&self, contract_id: ContractId) -> Result<Vec<ContractSigner>, AccordError> {
        self.load_signers(contract_id)
    }

    fn get_signer(&self, contract_id: ContractId, user_id: UserId) -> Result<Option<ContractSigner>, AccordError> {
        Ok(self.load_signers(contract_id)?.into_iter().find(|row| row.user_id == user_id))
    }

    fn contracts_for_signer(&self, user_id: UserId) -> Result<Vec<ContractId>, AccordError> {
        let prefix = Self::key_user_contract_prefix(user_id);
        let mut out = Vec::new();
        for key in self.scan_keys(CF_CONTRACT_INDEX, &prefix)? {
            let suffix = <[u8; 8]>::try_from(&key[prefix.len()..])
                .map_err(|_| crate::storage_err!("decode user contract index", "corrupt key"))?;
            out.push(ContractId::new(u64::from_be_bytes(suffix)));
        }
        Ok(out)
    }

    fn add_signer(&self, contract_id: ContractId, slot: SignerSlot, now_nanos: u64) -> Result<AddedSigner, AccordError> {
        let lock = self.contract_lock(contract_id)?;
        let _guard = lock_bounded(&lock, "rocks contract lock")?;
        let _index = lock_bounded(&self.index_lock, "rocks index lock")?;
        if self.load_contract(contract_id)?.is_none() {
            return Err(RegistryError::ContractNotFound(contract_id).into());
        }
        match &slot {
            SignerSlot::Existing(user_id) => {
                let user_id = *user_id;
                if self.load_user(user_id)?.is_none() {
                    return Err(RegistryError::UserNotFound(user_id).into());
                }
                if self.load_signers(contract_id)?.iter().any(|row| row.user_id == user_id) {
                    return Err(RegistryError::DuplicateSigner { contract_id, user_id }.into());
                }
            }
            SignerSlot::Provision(new_user) => {
                let email = normalize_email(&new_user.email);
                if self.lookup_email(&email)?.is_some() {
                    return Err(RegistryError::DuplicateEmail { email }.into());
                }
            }
        }

        let mut ids = IdAllocator::load(self)?;
        let mut batch = RocksBatch::new(&self.db);
        let (user_id, provisioned) = match slot {
            SignerSlot::Existing(user_id) => (user_id, None),
            SignerSlot::Provision(new_user) => {
                let user = Self::user_from_new(&mut ids, new_user);
                batch.put(self.cf_handle(CF_USER)?, &Self::key_user(user.id), &Self::encode(&user)?);
                batch.put(self.cf_handle(CF_USER_INDEX)?, &Self::key_email(&user.email), &Self::encode(&user.id)?);
                (user.id, Some(user))
            }
        };
        let row = ContractSigner::pending(ids.signer_row_id(), contract_id, user_id, now_nanos);
        self.put_signer(&mut batch, &row)?;
        batch.put(self.cf_handle(CF_CONTRACT_INDEX)?, &Self::key_user_contract(user_id, contract_id), &[]);
        ids.persist(&mut batch, self.cf_handle(CF_METADATA)?);
        batch.commit()?;
        debug!("signer added contract_id={} user_id={} row_id={} provisioned={}", contract_id, user_id, row.id, provisioned.is_some());
        Ok(AddedSigner { signer: row, provisioned })
    }

    fn remove_signer(&self, contract_id: ContractId, user_id: UserId) -> Result<ContractSigner, AccordError> {
        let lock = self.contract_lock(contract_id)?;
        let _guard = lock_bounded(&lock, "rocks contract lock")?;
        if self.load_contract(contract_id)?.is_none() {
            return Err(RegistryError::ContractNotFound(contract_id).into());
        }
        let row = self
            .load_signers(contract_id)?
            .into_iter()
            .find(|row| row.user_id == user_id)
            .ok_or(RegistryError::SignerNotFound { contract_id, user_id })?;
        if row.status == SignerStatus::Signed {
            return Err(RegistryError::SignerNotRemovable { contract_id, user_id }.into());
        }
        let mut batch = RocksBatch::new(&self.db);
        batch.delete(self.cf_handle(CF_SIGNER)?, &Self::key_signer(contract_id, row.id));
        batch.delete(self.cf_handle(CF_CONTRACT_INDEX)?, &Self::key_user_contract(user_id, contract_id));
        batch.commit()?;
        debug!("signer removed contract_id={} user_id={}", contract_id, user_id);
        Ok(row)
    }

    fn record_signature(&self, write: SignatureWrite) -> Result<SignatureOutcome, AccordError> {
        let contract_id = write.contract_id;
        let lock = self.contract_lock(contract_id)?;
        let _guard = lock_bounded(&lock, "rocks contract lock")?;

        let mut contract = self.load_contract(contract_id)?.ok_or(RegistryError::ContractNotFound(contract_id))?;
        let mut rows = self.load_signers(contract_id)?;
        let index = apply_signature(&mut contract, &mut rows, &write)?;
        let signer = rows[index].clone();

        let mut batch = RocksBatch::new(&self.db);
        self.put_signer(&mut batch, &signer)?;
        batch.put(self.cf_handle(CF_CONTRACT)?, &Self::key_contract(contract_id), &Self::encode(&contract)?);
        let intent: Option<SubmissionIntent> = self.get_value(CF_INTENT, &Self::key_intent(contract_id))?;
        if intent.is_some_and(|intent| intent.user_id == write.user_id) {
            batch.delete(self.cf_handle(CF_INTENT)?, &Self::key_intent(contract_id));
        }
        batch.commit()?;
        debug!(
            "signature recorded contract_id={} user_id={} tx_ref={:#x} parent_tx_ref={:#x} status={}",
            contract_id,
            write.user_id,
            write.tx_ref,
            signer.parent_tx_ref.unwrap_or(contract.genesis_tx_ref),
            contract.status
        );
        Ok(SignatureOutcome { signer, contract })
    }

    fn put_intent(&self, intent: &SubmissionIntent) -> Result<(), AccordError> {
        self.journal_put(intent)
    }

    fn get_intent(&self, contract_id: ContractId) -> Result<Option<SubmissionIntent>, AccordError> {
        self.journal_get(contract_id)
    }

    fn clear_intent(&self, contract_id: ContractId) -> Result<bool, AccordError> {
        self.journal_clear(contract_id)
    }

    fn list_intents(&self) -> Result<Vec<SubmissionIntent>, AccordError> {
        self.journal_list()
    }

    fn health_check(&self) -> Result<(), AccordError> {
        self.cf_handle(CF_METADATA).map(|_| ())
    }
}
