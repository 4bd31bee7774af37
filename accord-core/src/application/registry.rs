//! Off-chain contract and signer registry.

use crate::domain::contract::{normalize_email, validate_draft, validate_email};
use crate::domain::linkage::{self, ChainBreak};
use crate::domain::{Contract, ContractDraft, ContractSigner, ContractStatus, SignerInvite, SignerStatus, User};
use crate::foundation::{
    now_nanos, AccordError, ContractId, KeyHash, RegistryError, ResultExt, TxRef, UserId, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use crate::infrastructure::credentials::CredentialIssuer;
use crate::infrastructure::notify::{ContractCreatedNotice, Invitation, Notifier};
use crate::infrastructure::storage::{
    ContractCreation, NewUser, RegistryStorage, SignatureOutcome, SignatureWrite, SignerSlot,
};
use log::{debug, info, warn};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDetails {
    pub contract: Contract,
    /// Insertion order.
    pub signers: Vec<ContractSigner>,
    pub latest_tx_ref: TxRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub creator_id: Option<UserId>,
    pub offset: usize,
    /// Zero selects the default page size.
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub contract_id: ContractId,
    pub genesis_tx_ref: TxRef,
    /// References of the intact prefix of the chain, oldest first.
    pub links: Vec<TxRef>,
    pub broken: Option<ChainBreak>,
}

impl ChainVerification {
    pub fn is_intact(&self) -> bool {
        self.broken.is_none()
    }
}

pub struct ContractRegistry {
    storage: Arc<dyn RegistryStorage>,
    credentials: Arc<dyn CredentialIssuer>,
    notifier: Arc<dyn Notifier>,
}

impl ContractRegistry {
    pub fn new(storage: Arc<dyn RegistryStorage>, credentials: Arc<dyn CredentialIssuer>, notifier: Arc<dyn Notifier>) -> Self {
        Self { storage, credentials, notifier }
    }

    pub fn storage(&self) -> &Arc<dyn RegistryStorage> {
        &self.storage
    }

    pub fn register_user(&self, email: &str, name: &str, password: &SecretString) -> Result<User, AccordError> {
        let email = normalize_email(email);
        validate_email(&email)
            .map_err(|reason| RegistryError::InvalidContract(vec![format!("email '{}': {}", email, reason)]))?;
        let password_hash = self.credentials.hash(password)?;
        let user = self.storage.insert_user(NewUser { email, name: name.trim().to_string(), password_hash, created_at_nanos: now_nanos() })?;
        debug!("user registered user_id={}", user.id);
        Ok(user)
    }

    /// Returns the user when the password matches the stored hash.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AccordError> {
        let Some(user) = self.storage.get_user_by_email(email)? else {
            return Ok(None);
        };
        Ok(self.credentials.verify(password, &user.password_hash)?.then_some(user))
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User, AccordError> {
        self.storage.get_user(user_id).required(|| RegistryError::UserNotFound(user_id).into())
    }

    /// Creates the contract with every signer row in one atomic write, provisioning unknown
    /// signers. Invitations go out only after the write commits.
    pub async fn create_contract(&self, draft: ContractDraft, invites: Vec<SignerInvite>) -> Result<ContractDetails, AccordError> {
        validate_draft(&draft, &invites).map_err(RegistryError::InvalidContract)?;
        let creator = self.get_user(draft.creator_id)?;
        let now = now_nanos();

        let mut slots = Vec::with_capacity(invites.len());
        let mut secrets: Vec<(String, SecretString)> = Vec::new();
        for invite in &invites {
            let email = normalize_email(&invite.email);
            match self.storage.get_user_by_email(&email)? {
                Some(user) => slots.push(SignerSlot::Existing(user.id)),
                None => {
                    let issued = self.credentials.issue()?;
                    let name = invite.name.clone().filter(|name| !name.trim().is_empty()).unwrap_or_else(|| email.clone());
                    slots.push(SignerSlot::Provision(NewUser {
                        email: email.clone(),
                        name,
                        password_hash: issued.password_hash,
                        created_at_nanos: now,
                    }));
                    secrets.push((email, issued.password));
                }
            }
        }

        let created = self.storage.create_contract(ContractCreation { draft, slots, now_nanos: now })?;
        let contract = created.contract;
        info!(
            "contract created contract_id={} genesis={:#x} signers={} provisioned={}",
            contract.id,
            contract.genesis_tx_ref,
            created.signers.len(),
            created.provisioned.len()
        );

        for user in &created.provisioned {
            let Some(position) = secrets.iter().position(|(email, _)| *email == user.email) else {
                continue;
            };
            let (email, password) = secrets.swap_remove(position);
            let invitation =
                Invitation { contract_id: contract.id, contract_name: contract.name.clone(), email, name: user.name.clone(), password };
            if let Err(err) = self.notifier.send_invitation(invitation).await {
                warn!("invitation delivery failed contract_id={} user_id={} error={}", contract.id, user.id, err);
            }
        }

        let mut signer_emails = Vec::with_capacity(created.signers.len());
        for row in &created.signers {
            if let Some(user) = self.storage.get_user(row.user_id)? {
                signer_emails.push(user.email);
            }
        }
        let notice = ContractCreatedNotice {
            contract_id: contract.id,
            contract_name: contract.name.clone(),
            creator_email: creator.email,
            signer_emails,
        };
        if let Err(err) = self.notifier.send_contract_created(notice).await {
            warn!("contract notice delivery failed contract_id={} error={}", contract.id, err);
        }

        let latest_tx_ref = contract.genesis_tx_ref;
        Ok(ContractDetails { contract, signers: created.signers, latest_tx_ref })
    }

    pub fn get_contract(&self, contract_id: ContractId) -> Result<ContractDetails, AccordError> {
        let contract = self.load_contract(contract_id)?;
        self.details(contract)
    }

    pub fn find_by_genesis(&self, genesis_tx_ref: &TxRef) -> Result<ContractDetails, AccordError> {
        let contract = self.storage.find_contract_by_genesis(genesis_tx_ref)?.ok_or(RegistryError::GenesisNotFound(*genesis_tx_ref))?;
        self.details(contract)
    }

    /// Newest first.
    pub fn list_contracts(&self, filter: &ContractFilter) -> Result<Page<Contract>, AccordError> {
        let limit = match filter.limit {
            0 => DEFAULT_PAGE_LIMIT,
            limit => limit.min(MAX_PAGE_LIMIT),
        };
        let mut matching: Vec<Contract> = self
            .storage
            .list_contracts()?
            .into_iter()
            .filter(|contract| filter.status.map_or(true, |status| contract.status == status))
            .filter(|contract| filter.creator_id.map_or(true, |creator| contract.creator_id == creator))
            .collect();
        matching.sort_by(|a, b| b.created_at_nanos.cmp(&a.created_at_nanos).then(b.id.cmp(&a.id)));
        let total = matching.len();
        let items = matching.into_iter().skip(filter.offset).take(limit).collect();
        Ok(Page { items, total, offset: filter.offset, limit })
    }

    /// Contracts the user created or is invited to sign, by id.
    pub fn contracts_for_user(&self, user_id: UserId) -> Result<Vec<Contract>, AccordError> {
        let mut ids: BTreeSet<ContractId> = self.storage.contracts_for_signer(user_id)?.into_iter().collect();
        for contract in self.storage.list_contracts()? {
            if contract.creator_id == user_id {
                ids.insert(contract.id);
            }
        }
        let mut contracts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(contract) = self.storage.get_contract(id)? {
                contracts.push(contract);
            }
        }
        Ok(contracts)
    }

    pub fn delete_contract(&self, contract_id: ContractId) -> Result<(), AccordError> {
        if !self.storage.delete_contract(contract_id)? {
            return Err(RegistryError::ContractNotFound(contract_id).into());
        }
        info!("contract deleted contract_id={}", contract_id);
        Ok(())
    }

    /// Adds a signer row, provisioning and inviting the user when the email is new.
    pub async fn add_signer(&self, contract_id: ContractId, invite: SignerInvite) -> Result<ContractSigner, AccordError> {
        let contract = self.load_contract(contract_id)?;
        let email = normalize_email(&invite.email);
        validate_email(&email)
            .map_err(|reason| RegistryError::InvalidContract(vec![format!("signer email '{}': {}", invite.email, reason)]))?;

        let now = now_nanos();
        let (slot, secret) = match self.storage.get_user_by_email(&email)? {
            Some(user) => (SignerSlot::Existing(user.id), None),
            None => {
                let issued = self.credentials.issue()?;
                let name = invite.name.clone().filter(|name| !name.trim().is_empty()).unwrap_or_else(|| email.clone());
                let new_user = NewUser { email, name, password_hash: issued.password_hash, created_at_nanos: now };
                (SignerSlot::Provision(new_user), Some(issued.password))
            }
        };

        let added = self.storage.add_signer(contract_id, slot, now)?;
        let row = added.signer;
        debug!("signer added contract_id={} user_id={} row_id={}", contract_id, row.user_id, row.id);
        if let (Some(user), Some(password)) = (added.provisioned, secret) {
            let invitation =
                Invitation { contract_id, contract_name: contract.name, email: user.email.clone(), name: user.name.clone(), password };
            if let Err(err) = self.notifier.send_invitation(invitation).await {
                warn!("invitation delivery failed contract_id={} user_id={} error={}", contract_id, user.id, err);
            }
        }
        Ok(row)
    }

    pub fn remove_signer(&self, contract_id: ContractId, user_id: UserId) -> Result<ContractSigner, AccordError> {
        let row = self.storage.remove_signer(contract_id, user_id)?;
        debug!("signer removed contract_id={} user_id={}", contract_id, user_id);
        Ok(row)
    }

    pub fn list_signers(&self, contract_id: ContractId) -> Result<Vec<ContractSigner>, AccordError> {
        self.load_contract(contract_id)?;
        self.storage.list_signers(contract_id)
    }

    pub fn signer_status(&self, contract_id: ContractId, user_id: UserId) -> Result<SignerStatus, AccordError> {
        let row = self.storage.get_signer(contract_id, user_id)?.ok_or(RegistryError::SignerNotFound { contract_id, user_id })?;
        Ok(row.status)
    }

    /// Reference the next signing transaction of the contract must spend.
    pub fn latest_transaction_ref(&self, contract_id: ContractId) -> Result<TxRef, AccordError> {
        let contract = self.load_contract(contract_id)?;
        let signers = self.storage.list_signers(contract_id)?;
        Ok(linkage::latest_transaction_ref(contract.genesis_tx_ref, &signers))
    }

    /// Marks the signer's row signed, linking it to whatever is latest at write time.
    pub fn record_signature(&self, contract_id: ContractId, user_id: UserId, tx_ref: TxRef) -> Result<SignatureOutcome, AccordError> {
        self.write_signature(SignatureWrite {
            contract_id,
            user_id,
            tx_ref,
            expected_parent: None,
            threshold_reached: false,
            signed_at_nanos: now_nanos(),
        })
    }

    /// Like [`Self::record_signature`] but fails with `ChainConflict` unless the latest
    /// reference still equals `expected_parent`.
    pub fn record_signature_expecting(
        &self,
        contract_id: ContractId,
        user_id: UserId,
        tx_ref: TxRef,
        expected_parent: TxRef,
        threshold_reached: bool,
    ) -> Result<SignatureOutcome, AccordError> {
        self.write_signature(SignatureWrite {
            contract_id,
            user_id,
            tx_ref,
            expected_parent: Some(expected_parent),
            threshold_reached,
            signed_at_nanos: now_nanos(),
        })
    }

    fn write_signature(&self, write: SignatureWrite) -> Result<SignatureOutcome, AccordError> {
        let (contract_id, user_id, tx_ref) = (write.contract_id, write.user_id, write.tx_ref);
        let outcome = self.storage.record_signature(write)?;
        info!(
            "signature recorded contract_id={} user_id={} tx_ref={:#x} parent={} status={}",
            contract_id,
            user_id,
            tx_ref,
            outcome.signer.parent_tx_ref.map(|parent| parent.to_string()).unwrap_or_default(),
            outcome.contract.status
        );
        Ok(outcome)
    }

    pub fn advance_status(&self, contract_id: ContractId, status: ContractStatus) -> Result<Contract, AccordError> {
        self.storage.advance_contract_status(contract_id, status, now_nanos())
    }

    /// Signed rows in chain order.
    pub fn chain(&self, contract_id: ContractId) -> Result<Vec<ContractSigner>, AccordError> {
        self.load_contract(contract_id)?;
        let signers = self.storage.list_signers(contract_id)?;
        Ok(linkage::chain(&signers).into_iter().cloned().collect())
    }

    pub fn verify_chain(&self, contract_id: ContractId) -> Result<ChainVerification, AccordError> {
        let contract = self.load_contract(contract_id)?;
        let signers = self.storage.list_signers(contract_id)?;
        let (links, broken) = match linkage::verify_chain(contract.genesis_tx_ref, &signers) {
            Ok(links) => (links, None),
            Err(broken) => {
                warn!(
                    "chain broken contract_id={} position={} row_id={} expected_parent={}",
                    contract_id, broken.position, broken.row_id, broken.expected_parent
                );
                let links = linkage::chain(&signers).iter().take(broken.position).filter_map(|row| row.tx_ref).collect();
                (links, Some(broken))
            }
        };
        Ok(ChainVerification { contract_id, genesis_tx_ref: contract.genesis_tx_ref, links, broken })
    }

    /// Binds a wallet to the user on first use; afterwards the address must match.
    pub fn verify_user_wallet(&self, user_id: UserId, wallet_address: &str) -> Result<User, AccordError> {
        let mut user = self.get_user(user_id)?;
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Err(RegistryError::WalletMismatch(user_id).into());
        }
        match user.wallet_address.as_deref() {
            Some(bound) if bound == wallet_address => Ok(user),
            Some(_) => Err(RegistryError::WalletMismatch(user_id).into()),
            None => {
                user.wallet_address = Some(wallet_address.to_string());
                user.updated_at_nanos = now_nanos();
                self.storage.update_user(&user)?;
                info!("wallet bound user_id={}", user_id);
                Ok(user)
            }
        }
    }

    pub fn set_user_key_hash(&self, user_id: UserId, key_hash: KeyHash) -> Result<User, AccordError> {
        let mut user = self.get_user(user_id)?;
        user.key_hash = Some(key_hash);
        user.updated_at_nanos = now_nanos();
        self.storage.update_user(&user)?;
        Ok(user)
    }

    /// Key hash the user co-signs ledger transactions with.
    pub fn signing_key(&self, user_id: UserId) -> Result<KeyHash, AccordError> {
        self.get_user(user_id)?.key_hash.ok_or_else(|| RegistryError::SignerKeyUnknown(user_id).into())
    }

    fn load_contract(&self, contract_id: ContractId) -> Result<Contract, AccordError> {
        self.storage.get_contract(contract_id).required(|| RegistryError::ContractNotFound(contract_id).into())
    }

    fn details(&self, contract: Contract) -> Result<ContractDetails, AccordError> {
        let signers = self.storage.list_signers(contract.id)?;
        let latest_tx_ref = linkage::latest_transaction_ref(contract.genesis_tx_ref, &signers);
        Ok(ContractDetails { contract, signers, latest_tx_ref })
    }
}
