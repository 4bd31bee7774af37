use crate::domain::{Contract, ContractDraft, ContractSigner, ContractStatus, SubmissionIntent, User};
use crate::foundation::{AccordError, ContractId, TxRef, UserId};

pub type Result<T> = std::result::Result<T, AccordError>;

/// A user row to be created; the id is allocated by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at_nanos: u64,
}

/// One signer position of a contract being created, in invitation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerSlot {
    Existing(UserId),
    Provision(NewUser),
}

#[derive(Debug, Clone)]
pub struct ContractCreation {
    pub draft: ContractDraft,
    pub slots: Vec<SignerSlot>,
    pub now_nanos: u64,
}

#[derive(Debug, Clone)]
pub struct CreatedContract {
    pub contract: Contract,
    pub signers: Vec<ContractSigner>,
    /// Users provisioned by this creation, in slot order.
    pub provisioned: Vec<User>,
}

#[derive(Debug, Clone)]
pub struct AddedSigner {
    pub signer: ContractSigner,
    /// The user created for a `SignerSlot::Provision` slot.
    pub provisioned: Option<User>,
}

/// A signer row flip, applied atomically with its parent capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureWrite {
    pub contract_id: ContractId,
    pub user_id: UserId,
    pub tx_ref: TxRef,
    /// When set, the write only applies if the contract's latest reference still equals it.
    pub expected_parent: Option<TxRef>,
    /// Ledger record reached its threshold with this signature.
    pub threshold_reached: bool,
    pub signed_at_nanos: u64,
}

#[derive(Debug, Clone)]
pub struct SignatureOutcome {
    pub signer: ContractSigner,
    pub contract: Contract,
}

/// Persistence for the contract registry.
///
/// Implementations serialize all writes touching one contract, so the parent read and the
/// status flip in [`RegistryStorage::record_signature`] form one unit relative to other
/// writers. Writes on different contracts do not contend.
pub trait RegistryStorage: Send + Sync {
    /// Fails with `DuplicateGenesis` if the genesis reference is taken. Either every row is
    /// written or none is.
    fn create_contract(&self, creation: ContractCreation) -> Result<CreatedContract>;
    fn get_contract(&self, contract_id: ContractId) -> Result<Option<Contract>>;
    fn find_contract_by_genesis(&self, genesis_tx_ref: &TxRef) -> Result<Option<Contract>>;
    fn list_contracts(&self) -> Result<Vec<Contract>>;
    /// Removes the contract with its signer rows and journal entry.
    fn delete_contract(&self, contract_id: ContractId) -> Result<bool>;
    fn advance_contract_status(&self, contract_id: ContractId, status: ContractStatus, now_nanos: u64) -> Result<Contract>;

    fn insert_user(&self, user: NewUser) -> Result<User>;
    fn get_user(&self, user_id: UserId) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn update_user(&self, user: &User) -> Result<()>;

    /// Signer rows in insertion order.
    fn list_signers(&self, contract_id: ContractId) -> Result<Vec<ContractSigner>>;
    fn get_signer(&self, contract_id: ContractId, user_id: UserId) -> Result<Option<ContractSigner>>;
    fn contracts_for_signer(&self, user_id: UserId) -> Result<Vec<ContractId>>;
    /// Appends a pending row. A provisioned user is written in the same unit as the row, so
    /// a failed add leaves no user behind.
    fn add_signer(&self, contract_id: ContractId, slot: SignerSlot, now_nanos: u64) -> Result<AddedSigner>;
    fn remove_signer(&self, contract_id: ContractId, user_id: UserId) -> Result<ContractSigner>;
    /// Flips a pending row to signed, recording the contract's latest reference as its
    /// parent, clearing the contract's journal entry for that user and advancing status.
    fn record_signature(&self, write: SignatureWrite) -> Result<SignatureOutcome>;

    fn put_intent(&self, intent: &SubmissionIntent) -> Result<()>;
    fn get_intent(&self, contract_id: ContractId) -> Result<Option<SubmissionIntent>>;
    fn clear_intent(&self, contract_id: ContractId) -> Result<bool>;
    fn list_intents(&self) -> Result<Vec<SubmissionIntent>>;

    fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
