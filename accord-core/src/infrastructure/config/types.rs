use crate::infrastructure::credentials::Argon2Params;
use figment::value::{Dict, Map};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub credentials: Argon2Params,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Named override sections, applied by `load_config_with_profile`.
    #[serde(default, skip_serializing)]
    pub profiles: Option<Map<String, Dict>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the registry database. Empty means the loader's data dir.
    #[serde(default)]
    pub data_dir: String,
    /// Devnet-only escape hatch: wipe RocksDB if the schema version mismatches.
    #[serde(default)]
    pub allow_schema_wipe: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Bound on read-only queries (record fetch, status, successor lookup).
    pub request_timeout_ms: u64,
    /// Bound on a single submission.
    pub submit_timeout_ms: u64,
    /// Submissions attempted per signing call when the ledger reports nothing landed.
    pub max_submit_attempts: u32,
    pub query_retries: usize,
    pub query_retry_delay_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { request_timeout_ms: 10_000, submit_timeout_ms: 30_000, max_submit_attempts: 3, query_retries: 3, query_retry_delay_ms: 250 }
    }
}

impl LedgerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn query_retry_delay(&self) -> Duration {
        Duration::from_millis(self.query_retry_delay_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Maximum wait for a contract's exclusive signing slot.
    pub lock_timeout_ms: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self { lock_timeout_ms: 60_000 }
    }
}

impl SigningConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub interval_secs: u64,
    /// Intents younger than this are assumed to be in flight and skipped.
    pub confirmation_latency_secs: u64,
    /// Intents whose transaction is still unknown to the ledger after this are dropped.
    pub abandon_after_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { interval_secs: 30, confirmation_latency_secs: 120, abandon_after_secs: 3_600 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rolling log files; console only when unset.
    pub dir: Option<String>,
    /// Filter expression, e.g. `info,accord_core::application=debug,root=warn`.
    pub filters: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: None, filters: "info".to_string() }
    }
}
