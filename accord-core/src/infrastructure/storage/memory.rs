use super::rules::apply_signature;
use super::traits::{AddedSigner, ContractCreation, CreatedContract, NewUser, RegistryStorage, SignatureOutcome, SignatureWrite, SignerSlot};
use crate::domain::contract::normalize_email;
use crate::domain::{Contract, ContractSigner, ContractStatus, SignerStatus, SubmissionIntent, User};
use crate::foundation::{AccordError, ContractId, RegistryError, SignerRowId, TxRef, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryInner {
    contracts: BTreeMap<ContractId, Contract>,
    genesis_index: HashMap<TxRef, ContractId>,
    signers: BTreeMap<ContractId, Vec<ContractSigner>>,
    users: BTreeMap<UserId, User>,
    email_index: HashMap<String, UserId>,
    intents: BTreeMap<ContractId, SubmissionIntent>,
    next_contract_id: u64,
    next_user_id: u64,
    next_signer_row_id: u64,
}

impl MemoryInner {
    fn allocate_contract_id(&mut self) -> ContractId {
        self.next_contract_id += 1;
        ContractId::new(self.next_contract_id)
    }

    fn allocate_user_id(&mut self) -> UserId {
        self.next_user_id += 1;
        UserId::new(self.next_user_id)
    }

    fn allocate_signer_row_id(&mut self) -> SignerRowId {
        self.next_signer_row_id += 1;
        SignerRowId::new(self.next_signer_row_id)
    }

    fn user_from_new(&mut self, new_user: NewUser) -> User {
        User {
            id: self.allocate_user_id(),
            email: normalize_email(&new_user.email),
            name: new_user.name,
            password_hash: new_user.password_hash,
            wallet_address: None,
            key_hash: None,
            created_at_nanos: new_user.created_at_nanos,
            updated_at_nanos: new_user.created_at_nanos,
        }
    }
}

/// In-memory registry backend for tests.
///
/// One mutex guards everything, which makes every operation trivially atomic.
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryInner::default())) }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, MemoryInner>, AccordError> {
        self.inner
            .lock()
            .map_err(|_| AccordError::StorageError { operation: "memory storage lock".to_string(), details: "poisoned".to_string() })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStorage for MemoryStorage {
    fn create_contract(&self, creation: ContractCreation) -> Result<CreatedContract, AccordError> {
        let mut inner = self.lock_inner()?;
        let ContractCreation { draft, slots, now_nanos } = creation;

        if inner.genesis_index.contains_key(&draft.genesis_tx_ref) {
            return Err(RegistryError::DuplicateGenesis(draft.genesis_tx_ref).into());
        }
        if !inner.users.contains_key(&draft.creator_id) {
            return Err(RegistryError::UserNotFound(draft.creator_id).into());
        }
        // Validate every slot before mutating anything.
        for slot in &slots {
            match slot {
                SignerSlot::Existing(user_id) if !inner.users.contains_key(user_id) => {
                    return Err(RegistryError::UserNotFound(*user_id).into());
                }
                SignerSlot::Provision(new_user) if inner.email_index.contains_key(&normalize_email(&new_user.email)) => {
                    return Err(RegistryError::DuplicateEmail { email: normalize_email(&new_user.email) }.into());
                }
                _ => {}
            }
        }

        let contract_id = inner.allocate_contract_id();
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

        let mut provisioned = Vec::new();
        let mut signers: Vec<ContractSigner> = Vec::with_capacity(slots.len());
        for slot in slots {
            let user_id = match slot {
                SignerSlot::Existing(user_id) => user_id,
                SignerSlot::Provision(new_user) => {
                    let user = inner.user_from_new(new_user);
                    inner.email_index.insert(user.email.clone(), user.id);
                    inner.users.insert(user.id, user.clone());
                    let id = user.id;
                    provisioned.push(user);
                    id
                }
            };
            if signers.iter().any(|row| row.user_id == user_id) {
                continue;
            }
            let row_id = inner.allocate_signer_row_id();
            signers.push(ContractSigner::pending(row_id, contract_id, user_id, now_nanos));
        }

        inner.genesis_index.insert(contract.genesis_tx_ref, contract_id);
        inner.contracts.insert(contract_id, contract.clone());
        inner.signers.insert(contract_id, signers.clone());
        Ok(CreatedContract { contract, signers, provisioned })
    }

    fn get_contract(&self, contract_id: ContractId) -> Result<Option<Contract>, AccordError> {
        Ok(self.lock_inner()?.contracts.get(&contract_id).cloned())
    }

    fn find_contract_by_genesis(&self, genesis_tx_ref: &TxRef) -> Result<Option<Contract>, AccordError> {
        let inner = self.lock_inner()?;
        Ok(inner.genesis_index.get(genesis_tx_ref).and_then(|id| inner.contracts.get(id)).cloned())
    }

    fn list_contracts(&self) -> Result<Vec<Contract>, AccordError> {
        Ok(self.lock_inner()?.contracts.values().cloned().collect())
    }

    fn delete_contract(&self, contract_id: ContractId) -> Result<bool, AccordError> {
        let mut inner = self.lock_inner()?;
        let Some(contract) = inner.contracts.remove(&contract_id) else {
            return Ok(false);
        };
        inner.genesis_index.remove(&contract.genesis_tx_ref);
        inner.signers.remove(&contract_id);
        inner.intents.remove(&contract_id);
        Ok(true)
    }

    fn advance_contract_status(&self, contract_id: ContractId, status: ContractStatus, now_nanos: u64) -> Result<Contract, AccordError> {
        let mut inner = self.lock_inner()?;
        let contract = inner.contracts.get_mut(&contract_id).ok_or(RegistryError::ContractNotFound(contract_id))?;
        let next = contract.status.advance_to(status);
        if next != contract.status {
            contract.status = next;
            contract.updated_at_nanos = now_nanos;
        }
        Ok(contract.clone())
    }

    fn insert_user(&self, new_user: NewUser) -> Result<User, AccordError> {
        let mut inner = self.lock_inner()?;
        let email = normalize_email(&new_user.email);
        if inner.email_index.contains_key(&email) {
            return Err(RegistryError::DuplicateEmail { email }.into());
        }
        let user = inner.user_from_new(new_user);
        inner.email_index.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, user_id: UserId) -> Result<Option<User>, AccordError> {
        Ok(self.lock_inner()?.users.get(&user_id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AccordError> {
        let inner = self.lock_inner()?;
        Ok(inner.email_index.get(&normalize_email(email)).and_then(|id| inner.users.get(id)).cloned())
    }

    fn update_user(&self, user: &User) -> Result<(), AccordError> {
        let mut inner = self.lock_inner()?;
        let existing = inner.users.get_mut(&user.id).ok_or(RegistryError::UserNotFound(user.id))?;
        if normalize_email(&existing.email) != normalize_email(&user.email) {
            return Err(AccordError::StorageError { operation: "update_user".to_string(), details: "email is immutable".to_string() });
        }
        *existing = user.clone();
        Ok(())
    }

    fn list_signers(&self, contract_id: ContractId) -> Result<Vec<ContractSigner>, AccordError> {
        Ok(self.lock_inner()?.signers.get(&contract_id).cloned().unwrap_or_default())
    }

    fn get_signer(&self, contract_id: ContractId, user_id: UserId) -> Result<Option<ContractSigner>, AccordError> {
        let inner = self.lock_inner()?;
        Ok(inner.signers.get(&contract_id).and_then(|rows| rows.iter().find(|row| row.user_id == user_id)).cloned())
    }

    fn contracts_for_signer(&self, user_id: UserId) -> Result<Vec<ContractId>, AccordError> {
        let inner = self.lock_inner()?;
        Ok(inner.signers.iter().filter(|(_, rows)| rows.iter().any(|row| row.user_id == user_id)).map(|(id, _)| *id).collect())
    }

    fn add_signer(&self, contract_id: ContractId, slot: SignerSlot, now_nanos: u64) -> Result<AddedSigner, AccordError> {
        let mut inner = self.lock_inner()?;
        if !inner.contracts.contains_key(&contract_id) {
            return Err(RegistryError::ContractNotFound(contract_id).into());
        }
        let (user_id, provisioned) = match slot {
            SignerSlot::Existing(user_id) => {
                if !inner.users.contains_key(&user_id) {
                    return Err(RegistryError::UserNotFound(user_id).into());
                }
                if inner.signers.get(&contract_id).is_some_and(|rows| rows.iter().any(|row| row.user_id == user_id)) {
                    return Err(RegistryError::DuplicateSigner { contract_id, user_id }.into());
                }
                (user_id, None)
            }
            SignerSlot::Provision(new_user) => {
                let email = normalize_email(&new_user.email);
                if inner.email_index.contains_key(&email) {
                    return Err(RegistryError::DuplicateEmail { email }.into());
                }
                let user = inner.user_from_new(new_user);
                inner.email_index.insert(user.email.clone(), user.id);
                inner.users.insert(user.id, user.clone());
                (user.id, Some(user))
            }
        };
        let row = ContractSigner::pending(inner.allocate_signer_row_id(), contract_id, user_id, now_nanos);
        inner.signers.entry(contract_id).or_default().push(row.clone());
        Ok(AddedSigner { signer: row, provisioned })
    }

    fn remove_signer(&self, contract_id: ContractId, user_id: UserId) -> Result<ContractSigner, AccordError> {
        let mut inner = self.lock_inner()?;
        let rows = inner.signers.get_mut(&contract_id).ok_or(RegistryError::ContractNotFound(contract_id))?;
        let index =
            rows.iter().position(|row| row.user_id == user_id).ok_or(RegistryError::SignerNotFound { contract_id, user_id })?;
        if rows[index].status == SignerStatus::Signed {
            return Err(RegistryError::SignerNotRemovable { contract_id, user_id }.into());
        }
        Ok(rows.remove(index))
    }

    fn record_signature(&self, write: SignatureWrite) -> Result<SignatureOutcome, AccordError> {
        let mut guard = self.lock_inner()?;
        let inner = &mut *guard;
        let contract = inner.contracts.get(&write.contract_id).ok_or(RegistryError::ContractNotFound(write.contract_id))?;
        let mut contract = contract.clone();
        let mut rows = inner.signers.get(&write.contract_id).cloned().unwrap_or_default();

        let index = apply_signature(&mut contract, &mut rows, &write)?;
        let signer = rows[index].clone();
        inner.signers.insert(write.contract_id, rows);
        inner.contracts.insert(write.contract_id, contract.clone());
        if inner.intents.get(&write.contract_id).is_some_and(|intent| intent.user_id == write.user_id) {
            inner.intents.remove(&write.contract_id);
        }
        Ok(SignatureOutcome { signer, contract })
    }

    fn put_intent(&self, intent: &SubmissionIntent) -> Result<(), AccordError> {
        let mut inner = self.lock_inner()?;
        if !inner.contracts.contains_key(&intent.contract_id) {
            return Err(RegistryError::ContractNotFound(intent.contract_id).into());
        }
        inner.intents.insert(intent.contract_id, intent.clone());
        Ok(())
    }

    fn get_intent(&self, contract_id: ContractId) -> Result<Option<SubmissionIntent>, AccordError> {
        Ok(self.lock_inner()?.intents.get(&contract_id).cloned())
    }

    fn clear_intent(&self, contract_id: ContractId) -> Result<bool, AccordError> {
        Ok(self.lock_inner()?.intents.remove(&contract_id).is_some())
    }

    fn list_intents(&self) -> Result<Vec<SubmissionIntent>, AccordError> {
        Ok(self.lock_inner()?.intents.values().cloned().collect())
    }
}
