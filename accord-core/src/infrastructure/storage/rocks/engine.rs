//! RocksDB-backed storage engine.
//!
//! # Lock Semantics
//!
//! RocksDB itself is thread-safe, but we use coarse-grained mutexes to keep registry
//! invariants and batch updates consistent.
//!
//! - per-contract locks: guard every write touching one contract's rows (signature flips,
//!   signer add/remove, status, journal, delete). Different contracts never contend.
//! - `index_lock`: guards id allocation and the uniqueness indexes (email, genesis reference).
//!
//! Lock order is contract lock, then `index_lock`. Locks are acquired with a bounded timeout
//! (`STORAGE_LOCK_TIMEOUT_SECS`) to avoid indefinite deadlock under contention.
//!
//! # Column Families
//!
//! See `schema.rs` for column family names and key prefixes.

use crate::domain::{Contract, ContractSigner, User};
use crate::foundation::{AccordError, ContractId, SignerRowId, TxRef, UserId};
use crate::infrastructure::storage::rocks::migration::open_db_with_cfs;
use crate::infrastructure::storage::rocks::schema::*;
use crate::infrastructure::storage::rocks::util::lock_bounded;
use crate::storage_err;
use bincode::Options;
use log::{debug, info, warn};
use rocksdb::{checkpoint::Checkpoint, ColumnFamily, Direction, IteratorMode, DB};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::{env, fs};

mod batch;
mod journal;
mod registry;

const DB_DIR_NAME: &str = "accord-registry";
const DATA_DIR_ENV_VAR: &str = "ACCORD_DATA_DIR";

pub struct RocksStorage {
    db: Arc<DB>,
    contract_locks: Mutex<HashMap<ContractId, Arc<Mutex<()>>>>,
    index_lock: Mutex<()>,
}

impl RocksStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AccordError> {
        Self::open_with_options(path, false)
    }

    pub fn open_with_options(path: impl AsRef<Path>, allow_schema_wipe: bool) -> Result<Self, AccordError> {
        let path = path.as_ref();
        debug!("opening RocksStorage path={}", path.display());
        let db = open_db_with_cfs(path)?;
        let storage = Self { db: Arc::new(db), contract_locks: Mutex::new(HashMap::new()), index_lock: Mutex::new(()) };
        if let Err(err) = storage.maybe_run_migrations() {
            if allow_schema_wipe {
                if let AccordError::SchemaMismatch { stored, current } = err {
                    warn!("schema mismatch (stored={}, current={}); wiping db path={}", stored, current, path.display());
                    drop(storage);
                    if path.exists() {
                        fs::remove_dir_all(path).map_err(|err| storage_err!("fs::remove_dir_all schema_wipe", err))?;
                    }
                    return Self::open_with_options(path, false);
                }
            }
            return Err(err);
        }
        info!("RocksStorage opened path={}", path.display());
        Ok(storage)
    }

    pub fn open_default() -> Result<Self, AccordError> {
        if let Ok(data_dir) = env::var(DATA_DIR_ENV_VAR) {
            let trimmed = data_dir.trim();
            if !trimmed.is_empty() {
                let dir = Path::new(trimmed);
                fs::create_dir_all(dir).map_err(|err| storage_err!("fs::create_dir_all accord_data_dir", err))?;
                let path = dir.join(DB_DIR_NAME);
                debug!("opening RocksStorage ({}) path={}", DATA_DIR_ENV_VAR, path.display());
                return Self::open_with_options(path, false);
            }
        }
        let base = env::current_dir().map_err(|err| storage_err!("env::current_dir", err))?;
        let dir = base.join(".accord");
        fs::create_dir_all(&dir).map_err(|err| storage_err!("fs::create_dir_all default_dir", err))?;
        let path = dir.join(DB_DIR_NAME);
        debug!("opening RocksStorage (default dir) path={}", path.display());
        Self::open_with_options(path, false)
    }

    pub fn open_in_dir(data_dir: impl AsRef<Path>) -> Result<Self, AccordError> {
        Self::open_in_dir_with_options(data_dir, false)
    }

    pub fn open_in_dir_with_options(data_dir: impl AsRef<Path>, allow_schema_wipe: bool) -> Result<Self, AccordError> {
        let dir = data_dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Self::open_default();
        }
        fs::create_dir_all(dir).map_err(|err| storage_err!("fs::create_dir_all open_in_dir", err))?;
        let path = dir.join(DB_DIR_NAME);
        debug!("opening RocksStorage in dir path={}", path.display());
        Self::open_with_options(path, allow_schema_wipe)
    }

    pub fn create_checkpoint(&self, path: impl AsRef<Path>) -> Result<(), AccordError> {
        let path = path.as_ref();
        info!("creating RocksStorage checkpoint path={}", path.display());
        if path.exists() {
            let mut entries = fs::read_dir(path).map_err(|err| storage_err!("fs::read_dir checkpoint", err))?;
            if entries.next().is_some() {
                return Err(AccordError::StorageError {
                    operation: "rocksdb checkpoint".to_string(),
                    details: format!("checkpoint directory is not empty: {}", path.display()),
                });
            }
            fs::remove_dir_all(path).map_err(|err| storage_err!("fs::remove_dir_all checkpoint", err))?;
        }
        let checkpoint = Checkpoint::new(&self.db).map_err(|err| storage_err!("rocksdb::Checkpoint::new", err))?;
        checkpoint.create_checkpoint(path).map_err(|err| storage_err!("rocksdb::create_checkpoint", err))?;
        info!("checkpoint created path={}", path.display());
        Ok(())
    }

    pub fn compact(&self) -> Result<(), AccordError> {
        debug!("rocksdb compact_range start");
        self.db.compact_range(None::<&[u8]>, None::<&[u8]>);
        debug!("rocksdb compact_range complete");
        Ok(())
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily, AccordError> {
        self.db.cf_handle(name).ok_or_else(|| AccordError::StorageError {
            operation: "rocksdb cf_handle".to_string(),
            details: format!("missing column family: {}", name),
        })
    }

    fn maybe_run_migrations(&self) -> Result<(), AccordError> {
        match self.schema_version()? {
            None => {
                info!("initializing fresh db schema schema_version={}", SCHEMA_VERSION);
                self.set_schema_version(SCHEMA_VERSION)?;
            }
            Some(v) if v == SCHEMA_VERSION => {}
            Some(v) => return Err(AccordError::SchemaMismatch { stored: v, current: SCHEMA_VERSION }),
        }
        Ok(())
    }

    fn schema_version(&self) -> Result<Option<u32>, AccordError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self.db.get_cf(cf, KEY_SCHEMA_VERSION) {
            Ok(Some(bytes)) if bytes.len() == 4 => {
                let array: [u8; 4] = bytes.as_slice().try_into().map_err(|_| AccordError::StorageError {
                    operation: "schema_version decode".to_string(),
                    details: "corrupt schema version".to_string(),
                })?;
                Ok(Some(u32::from_be_bytes(array)))
            }
            Ok(Some(_)) => Err(AccordError::StorageError {
                operation: "schema_version decode".to_string(),
                details: "corrupt schema version".to_string(),
            }),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err!("rocksdb get_cf schema_version", e)),
        }
    }

    fn set_schema_version(&self, version: u32) -> Result<(), AccordError> {
        let cf = self.cf_handle(CF_METADATA)?;
        self.db.put_cf(cf, KEY_SCHEMA_VERSION, version.to_be_bytes()).map_err(AccordError::from)
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, AccordError> {
        bincode::DefaultOptions::new().with_fixint_encoding().serialize(value).map_err(|err| err.into())
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, AccordError> {
        bincode::DefaultOptions::new().with_fixint_encoding().deserialize(bytes).map_err(|err| err.into())
    }

    fn contract_lock(&self, contract_id: ContractId) -> Result<Arc<Mutex<()>>, AccordError> {
        let mut table = lock_bounded(&self.contract_locks, "rocks contract lock table")?;
        Ok(table.entry(contract_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone())
    }

    fn forget_contract_lock(&self, contract_id: ContractId) -> Result<(), AccordError> {
        lock_bounded(&self.contract_locks, "rocks contract lock table")?.remove(&contract_id);
        Ok(())
    }

    fn key_contract(contract_id: ContractId) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_CONTRACT.len() + 8).prefix(PREFIX_CONTRACT).u64_be(contract_id.get()).build()
    }

    fn key_genesis(genesis_tx_ref: &TxRef) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_GENESIS.len() + 32).prefix(PREFIX_GENESIS).hash32(genesis_tx_ref.as_hash()).build()
    }

    fn key_signer_prefix(contract_id: ContractId) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_SIGNER.len() + 8 + 1).prefix(PREFIX_SIGNER).u64_be(contract_id.get()).sep().build()
    }

    fn key_signer(contract_id: ContractId, row_id: SignerRowId) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_SIGNER.len() + 8 + 1 + 8)
            .prefix(PREFIX_SIGNER)
            .u64_be(contract_id.get())
            .sep()
            .u64_be(row_id.get())
            .build()
    }

    fn key_user_contract_prefix(user_id: UserId) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_USER_CONTRACT.len() + 8 + 1).prefix(PREFIX_USER_CONTRACT).u64_be(user_id.get()).sep().build()
    }

    fn key_user_contract(user_id: UserId, contract_id: ContractId) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_USER_CONTRACT.len() + 8 + 1 + 8)
            .prefix(PREFIX_USER_CONTRACT)
            .u64_be(user_id.get())
            .sep()
            .u64_be(contract_id.get())
            .build()
    }

    fn key_user(user_id: UserId) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_USER.len() + 8).prefix(PREFIX_USER).u64_be(user_id.get()).build()
    }

    fn key_email(email: &str) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_EMAIL.len() + email.len()).prefix(PREFIX_EMAIL).str(email).build()
    }

    fn key_intent(contract_id: ContractId) -> Vec<u8> {
        KeyBuilder::with_capacity(PREFIX_INTENT.len() + 8).prefix(PREFIX_INTENT).u64_be(contract_id.get()).build()
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>, AccordError> {
        let cf = self.cf_handle(cf_name)?;
        match self.db.get_cf(cf, key).map_err(|err| storage_err!("rocksdb get_cf", err))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Values of every key under `prefix`, in key order.
    fn scan_prefix<T: serde::de::DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, T)>, AccordError> {
        let cf = self.cf_handle(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|err| storage_err!("rocksdb iterator", err))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key, Self::decode(&value)?));
        }
        Ok(out)
    }

    fn scan_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>, AccordError> {
        let cf = self.cf_handle(cf_name)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, _) = item.map_err(|err| storage_err!("rocksdb iterator", err))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(key);
        }
        Ok(out)
    }

    fn load_contract(&self, contract_id: ContractId) -> Result<Option<Contract>, AccordError> {
        self.get_value(CF_CONTRACT, &Self::key_contract(contract_id))
    }

    fn load_signers(&self, contract_id: ContractId) -> Result<Vec<ContractSigner>, AccordError> {
        Ok(self.scan_prefix(CF_SIGNER, &Self::key_signer_prefix(contract_id))?.into_iter().map(|(_, row)| row).collect())
    }

    fn load_user(&self, user_id: UserId) -> Result<Option<User>, AccordError> {
        self.get_value(CF_USER, &Self::key_user(user_id))
    }

    fn lookup_email(&self, email: &str) -> Result<Option<UserId>, AccordError> {
        self.get_value(CF_USER_INDEX, &Self::key_email(email))
    }

    fn read_counter(&self, key: &[u8]) -> Result<u64, AccordError> {
        let cf = self.cf_handle(CF_METADATA)?;
        match self.db.get_cf(cf, key).map_err(|err| storage_err!("rocksdb get_cf counter", err))? {
            None => Ok(0),
            Some(bytes) => {
                let array: [u8; 8] = bytes.as_slice().try_into().map_err(|_| storage_err!("decode counter", "corrupt value"))?;
                Ok(u64::from_be_bytes(array))
            }
        }
    }
}

/// Id allocator reading counters once and writing them back with the batch.
///
/// Only valid while `index_lock` is held.
struct IdAllocator {
    next_contract_id: u64,
    next_user_id: u64,
    next_signer_row_id: u64,
}

impl IdAllocator {
    fn load(storage: &RocksStorage) -> Result<Self, AccordError> {
        Ok(Self {
            next_contract_id: storage.read_counter(KEY_NEXT_CONTRACT_ID)?,
            next_user_id: storage.read_counter(KEY_NEXT_USER_ID)?,
            next_signer_row_id: storage.read_counter(KEY_NEXT_SIGNER_ROW_ID)?,
        })
    }

    fn contract_id(&mut self) -> ContractId {
        self.next_contract_id += 1;
        ContractId::new(self.next_contract_id)
    }

    fn user_id(&mut self) -> UserId {
        self.next_user_id += 1;
        UserId::new(self.next_user_id)
    }

    fn signer_row_id(&mut self) -> SignerRowId {
        self.next_signer_row_id += 1;
        SignerRowId::new(self.next_signer_row_id)
    }

    fn persist(&self, batch: &mut batch::RocksBatch<'_>, metadata: &ColumnFamily) {
        batch.put(metadata, KEY_NEXT_CONTRACT_ID, &self.next_contract_id.to_be_bytes());
        batch.put(metadata, KEY_NEXT_USER_ID, &self.next_user_id.to_be_bytes());
        batch.put(metadata, KEY_NEXT_SIGNER_ROW_ID, &self.next_signer_row_id.to_be_bytes());
    }
}
