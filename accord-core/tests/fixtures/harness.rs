#![allow(dead_code)]

use crate::fixtures::{key, TEST_CONTRACT_TYPE, TEST_EMAIL_DOMAIN};
use accord_core::application::{ContractLocks, ContractRegistry, Reconciler, SigningOrchestrator};
use accord_core::domain::record::encode_record;
use accord_core::domain::{ContractDraft, SignerInvite, StructuredRecord};
use accord_core::foundation::{ContractId, DocumentHash, KeyHash, TxRef, UserId};
use accord_core::infrastructure::config::{LedgerConfig, ReconciliationConfig};
use accord_core::infrastructure::credentials::{Argon2Issuer, Argon2Params};
use accord_core::infrastructure::ledger::MockLedger;
use accord_core::infrastructure::notify::RecordingNotifier;
use accord_core::infrastructure::storage::{MemoryStorage, RegistryStorage, RocksStorage};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub fn fast_argon2() -> Argon2Params {
    Argon2Params { m_cost: 256, t_cost: 1, p_cost: 1 }
}

pub fn test_ledger_config() -> LedgerConfig {
    LedgerConfig { request_timeout_ms: 1_000, submit_timeout_ms: 200, max_submit_attempts: 3, query_retries: 2, query_retry_delay_ms: 1 }
}

/// Every journaled intent is eligible immediately; nothing is abandoned.
pub fn eager_reconciliation() -> ReconciliationConfig {
    ReconciliationConfig { interval_secs: 1, confirmation_latency_secs: 0, abandon_after_secs: 3_600 }
}

pub struct ContractFixture {
    pub contract_id: ContractId,
    pub creator_id: UserId,
    /// Signer users in invitation order.
    pub signer_ids: Vec<UserId>,
    pub keys: Vec<KeyHash>,
    pub genesis: TxRef,
    pub record: StructuredRecord,
}

pub struct Harness {
    pub storage: Arc<dyn RegistryStorage>,
    pub ledger: Arc<MockLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub registry: Arc<ContractRegistry>,
    pub locks: Arc<ContractLocks>,
    pub orchestrator: Arc<SigningOrchestrator>,
    pub reconciler: Arc<Reconciler>,
    _dir: Option<TempDir>,
}

impl Harness {
    pub fn memory() -> Self {
        Self::build(Arc::new(MemoryStorage::new()), None, eager_reconciliation())
    }

    pub fn rocks() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let storage = RocksStorage::open_in_dir(dir.path()).expect("open rocksdb");
        Self::build(Arc::new(storage), Some(dir), eager_reconciliation())
    }

    pub fn memory_with(reconciliation: ReconciliationConfig) -> Self {
        Self::build(Arc::new(MemoryStorage::new()), None, reconciliation)
    }

    fn build(storage: Arc<dyn RegistryStorage>, dir: Option<TempDir>, reconciliation: ReconciliationConfig) -> Self {
        let ledger = Arc::new(MockLedger::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let issuer = Arc::new(Argon2Issuer::new(fast_argon2()).expect("argon2 params"));
        let registry = Arc::new(ContractRegistry::new(storage.clone(), issuer, notifier.clone()));
        let locks = Arc::new(ContractLocks::new(Duration::from_secs(10)));
        let orchestrator = Arc::new(SigningOrchestrator::new(registry.clone(), ledger.clone(), locks.clone(), test_ledger_config()));
        let reconciler =
            Arc::new(Reconciler::new(registry.clone(), ledger.clone(), locks.clone(), test_ledger_config(), reconciliation));
        Self { storage, ledger, notifier, registry, locks, orchestrator, reconciler, _dir: dir }
    }

    pub fn email(label: &str, role: &str) -> String {
        format!("{label}-{role}@{TEST_EMAIL_DOMAIN}")
    }

    /// Registers a creator, places the genesis record on the ledger, creates the contract
    /// with `signers` freshly provisioned signers and gives each of them a key hash.
    pub async fn contract(&self, label: &str, signers: u8, threshold: i64) -> ContractFixture {
        let creator = self
            .registry
            .register_user(&Self::email(label, "creator"), "Creator", &SecretString::new("creator-password".to_string()))
            .expect("register creator");

        let keys: Vec<KeyHash> = (1..=signers).map(key).collect();
        let record = StructuredRecord::genesis(
            DocumentHash::new(format!("document-{label}").into_bytes()),
            keys.clone(),
            threshold,
            key(0xee),
        );
        let genesis = self.ledger.insert_genesis(encode_record(&record));

        let draft = ContractDraft {
            name: format!("Contract {label}"),
            description: None,
            contract_type: TEST_CONTRACT_TYPE.to_string(),
            document_ref: format!("docs/{label}.pdf"),
            genesis_tx_ref: genesis,
            creator_id: creator.id,
        };
        let invites = (1..=signers).map(|i| SignerInvite::new(Self::email(label, &format!("signer{i}")))).collect();
        let details = self.registry.create_contract(draft, invites).await.expect("create contract");

        let signer_ids: Vec<UserId> = details.signers.iter().map(|row| row.user_id).collect();
        for (user_id, key) in signer_ids.iter().zip(&keys) {
            self.registry.set_user_key_hash(*user_id, key.clone()).expect("set key hash");
        }

        ContractFixture { contract_id: details.contract.id, creator_id: creator.id, signer_ids, keys, genesis, record }
    }
}
