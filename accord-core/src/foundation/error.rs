use crate::foundation::{ContractId, KeyHash, TxRef, UserId};
use std::io;
use thiserror::Error;

/// Malformed or unrecognized structured-record input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed CBOR at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("record too large: {size} bytes exceeds max {max}")]
    TooLarge { size: usize, max: usize },

    #[error("unexpected record shape: {0}")]
    UnexpectedShape(String),

    #[error("wrong record field count: expected {expected}, got {got}")]
    WrongFieldCount { expected: usize, got: usize },

    #[error("field {0} is not a valid integer")]
    BadNumber(&'static str),

    #[error("field {0} has an unrecognized shape")]
    BadField(&'static str),
}

/// Business-rule violation of the signing transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("unsupported redeemer action: {action}")]
    WrongAction { action: String },

    #[error("signer {0} is not a required signer")]
    NotAuthorizedSigner(KeyHash),

    #[error("signer {0} has already signed")]
    AlreadySigned(KeyHash),

    #[error("transaction is not co-signed by {0}")]
    TransactionNotCoSigned(KeyHash),

    #[error("invalid threshold {0}")]
    InvalidThreshold(i64),
}

/// Off-chain registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("contract not found: {0}")]
    ContractNotFound(ContractId),

    #[error("contract not found for genesis transaction {0}")]
    GenesisNotFound(TxRef),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("signer not found: contract_id={contract_id} user_id={user_id}")]
    SignerNotFound { contract_id: ContractId, user_id: UserId },

    #[error("contract already signed: contract_id={contract_id} user_id={user_id}")]
    AlreadySigned { contract_id: ContractId, user_id: UserId },

    #[error("chain conflict on contract {contract_id}: expected parent {expected}, latest is {actual}")]
    ChainConflict { contract_id: ContractId, expected: TxRef, actual: TxRef },

    #[error("user {user_id} is already a signer of contract {contract_id}")]
    DuplicateSigner { contract_id: ContractId, user_id: UserId },

    #[error("email already registered: {email}")]
    DuplicateEmail { email: String },

    #[error("genesis transaction already registered: {0}")]
    DuplicateGenesis(TxRef),

    #[error("signer cannot be removed after signing: contract_id={contract_id} user_id={user_id}")]
    SignerNotRemovable { contract_id: ContractId, user_id: UserId },

    #[error("user {0} has no key hash on record")]
    SignerKeyUnknown(UserId),

    #[error("wallet address does not match user {0}")]
    WalletMismatch(UserId),

    #[error("invalid contract: {}", .0.join("; "))]
    InvalidContract(Vec<String>),
}

/// Failures of the external ledger-submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("ledger rejected submission: {0}")]
    Rejected(String),

    #[error("ledger {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("no contract record at transaction {0}")]
    RecordNotFound(TxRef),

    #[error("submission {tx_ref} is awaiting confirmation")]
    Pending { tx_ref: TxRef },
}

/// Divergence between the ledger and the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    #[error("ledger accepted {tx_ref} for contract_id={contract_id} user_id={user_id} but the registry write failed: {details}")]
    UnrecordedSignature { contract_id: ContractId, user_id: UserId, tx_ref: TxRef, details: String },

    #[error("chain diverged on contract {contract_id}: ledger built on {ledger_parent}, registry latest is {registry_latest}")]
    ChainDiverged { contract_id: ContractId, ledger_parent: TxRef, registry_latest: TxRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Decode,
    Transition,
    Registry,
    Submission,
    Reconciliation,
    StorageError,
    StorageLockTimeout,
    LockTimeout,
    SchemaMismatch,
    SerializationError,
    EncodingError,
    ConfigError,
    CredentialError,
    NotificationError,
    ParseError,
    Message,
}

/// How a caller should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input or illegal transition; never retried.
    Rejected,
    /// Benign race or duplicate; surface as a conflict.
    Conflict,
    /// Transient; may be retried after the outcome is known.
    Retryable,
    /// Requires operator attention or reconciliation.
    Internal,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AccordError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("transition rejected: {0}")]
    Transition(#[from] TransitionError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("reconciliation required: {0}")]
    Reconciliation(#[from] ReconciliationError),

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("storage lock timeout: {operation} (waited {timeout_secs}s)")]
    StorageLockTimeout { operation: String, timeout_secs: u64 },

    #[error("contract {contract_id} is busy (waited {timeout_ms}ms)")]
    LockTimeout { contract_id: ContractId, timeout_ms: u64 },

    #[error("schema mismatch: stored={stored} current={current}")]
    SchemaMismatch { stored: u32, current: u32 },

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("credential error during {operation}: {details}")]
    CredentialError { operation: String, details: String },

    #[error("notification error: {0}")]
    NotificationError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, AccordError>;

impl AccordError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AccordError::Decode(_) => ErrorCode::Decode,
            AccordError::Transition(_) => ErrorCode::Transition,
            AccordError::Registry(_) => ErrorCode::Registry,
            AccordError::Submission(_) => ErrorCode::Submission,
            AccordError::Reconciliation(_) => ErrorCode::Reconciliation,
            AccordError::StorageError { .. } => ErrorCode::StorageError,
            AccordError::StorageLockTimeout { .. } => ErrorCode::StorageLockTimeout,
            AccordError::LockTimeout { .. } => ErrorCode::LockTimeout,
            AccordError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            AccordError::SerializationError { .. } => ErrorCode::SerializationError,
            AccordError::EncodingError(_) => ErrorCode::EncodingError,
            AccordError::ConfigError(_) => ErrorCode::ConfigError,
            AccordError::CredentialError { .. } => ErrorCode::CredentialError,
            AccordError::NotificationError(_) => ErrorCode::NotificationError,
            AccordError::ParseError(_) => ErrorCode::ParseError,
            AccordError::Message(_) => ErrorCode::Message,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AccordError::Decode(_) | AccordError::Transition(_) | AccordError::ParseError(_) | AccordError::EncodingError(_) => {
                ErrorClass::Rejected
            }
            AccordError::Registry(err) => match err {
                RegistryError::AlreadySigned { .. }
                | RegistryError::ChainConflict { .. }
                | RegistryError::DuplicateSigner { .. }
                | RegistryError::DuplicateGenesis(_)
                | RegistryError::DuplicateEmail { .. }
                | RegistryError::SignerNotRemovable { .. } => ErrorClass::Conflict,
                _ => ErrorClass::Rejected,
            },
            AccordError::Submission(err) => match err {
                SubmissionError::Rejected(_) | SubmissionError::RecordNotFound(_) => ErrorClass::Rejected,
                SubmissionError::Timeout { .. } | SubmissionError::Unavailable(_) | SubmissionError::Pending { .. } => {
                    ErrorClass::Retryable
                }
            },
            AccordError::StorageLockTimeout { .. } | AccordError::LockTimeout { .. } => ErrorClass::Retryable,
            _ => ErrorClass::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Retryable
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext { code: self.code(), message: self.to_string() }
    }

    pub fn credential(operation: impl Into<String>, details: impl Into<String>) -> Self {
        AccordError::CredentialError { operation: operation.into(), details: details.into() }
    }
}

impl From<hex::FromHexError> for AccordError {
    fn from(err: hex::FromHexError) -> Self {
        AccordError::EncodingError(format!("hex decode error: {}", err))
    }
}

impl From<rocksdb::Error> for AccordError {
    fn from(err: rocksdb::Error) -> Self {
        AccordError::StorageError { operation: "rocksdb".to_string(), details: err.to_string() }
    }
}

impl From<bincode::Error> for AccordError {
    fn from(err: bincode::Error) -> Self {
        AccordError::SerializationError { format: "bincode".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for AccordError {
    fn from(err: serde_json::Error) -> Self {
        AccordError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<io::Error> for AccordError {
    fn from(err: io::Error) -> Self {
        AccordError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<figment::Error> for AccordError {
    fn from(err: figment::Error) -> Self {
        AccordError::ConfigError(err.to_string())
    }
}

#[macro_export]
macro_rules! storage_err {
    ($op:expr, $err:expr) => {
        $crate::foundation::AccordError::StorageError { operation: $op.into(), details: $err.to_string() }
    };
}

#[macro_export]
macro_rules! serde_err {
    ($fmt:expr, $err:expr) => {
        $crate::foundation::AccordError::SerializationError { format: $fmt.into(), details: $err.to_string() }
    };
}

// NOTE: Avoid adding generic "stringly" error conversions here.
// Use structured variants at the call site to preserve context.
