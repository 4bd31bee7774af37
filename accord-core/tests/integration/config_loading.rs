use accord_core::application::ContractLocks;
use accord_core::infrastructure::config::{load_config, load_config_with_profile, CONFIG_FILE_NAME};
use accord_core::infrastructure::credentials::{Argon2Issuer, CredentialIssuer};
use accord_core::infrastructure::storage::{RegistryStorage, RocksStorage};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn profile_config_drives_storage_and_locks() {
    let dir = TempDir::new().expect("temp dir");
    let store_dir = dir.path().join("store");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        format!(
            r#"
            [signing]
            lock_timeout_ms = 5000

            [credentials]
            m_cost = 256
            t_cost = 1

            [profiles.local.storage]
            data_dir = "{}"
            "#,
            store_dir.display()
        ),
    )
    .expect("write config");

    let config = load_config_with_profile(dir.path(), "local").expect("load");
    config.validate().expect("valid");
    assert_eq!(config.storage.data_dir, store_dir.to_string_lossy());
    assert_eq!(config.signing.lock_timeout(), Duration::from_secs(5));
    assert_eq!(config.credentials.p_cost, 1);

    let storage = RocksStorage::open_in_dir(&config.storage.data_dir).expect("open");
    storage.health_check().expect("healthy");
    let locks = ContractLocks::new(config.signing.lock_timeout());
    assert!(locks.is_empty());

    let issuer = Argon2Issuer::new(config.credentials).expect("argon2");
    let issued = issuer.issue().expect("issue");
    assert!(issued.password_hash.starts_with("$argon2id$"));
}

#[test]
fn invalid_reconciliation_window_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
        [reconciliation]
        confirmation_latency_secs = 600
        abandon_after_secs = 60

        [ledger]
        max_submit_attempts = 0
        "#,
    )
    .expect("write config");

    let errors = load_config(dir.path()).expect("load").validate().expect_err("invalid");
    assert!(errors.iter().any(|e| e.contains("abandon_after_secs")));
    assert!(errors.iter().any(|e| e.contains("max_submit_attempts")));
}
