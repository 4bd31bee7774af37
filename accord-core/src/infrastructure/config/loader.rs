//! Layered configuration via Figment.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Profile overrides from `[profiles.<name>]`
//! 4. Environment variables (ACCORD_* prefix)

use crate::foundation::AccordError;
use crate::infrastructure::config::types::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::Dict;
use figment::{Figment, Profile};
use log::{debug, info};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "accord-config.toml";

/// Example: `ACCORD_LEDGER__SUBMIT_TIMEOUT_MS` -> `ledger.submit_timeout_ms`
const ENV_PREFIX: &str = "ACCORD_";

pub fn load_config(data_dir: &Path) -> Result<AppConfig, AccordError> {
    load_config_from_file(&data_dir.join(CONFIG_FILE_NAME), data_dir)
}

pub fn load_config_with_profile(data_dir: &Path, profile: &str) -> Result<AppConfig, AccordError> {
    load_config_from_file_with_profile(&data_dir.join(CONFIG_FILE_NAME), data_dir, profile)
}

pub fn load_config_from_file(path: &Path, data_dir: &Path) -> Result<AppConfig, AccordError> {
    info!("loading configuration path={} data_dir={}", path.display(), data_dir.display());
    let mut config: AppConfig = figment_base(path)
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| AccordError::ConfigError(format!("config extraction failed: {e}")))?;
    postprocess(&mut config, data_dir);
    debug!("configuration loaded storage_dir={} ledger_submit_timeout_ms={}", config.storage.data_dir, config.ledger.submit_timeout_ms);
    Ok(config)
}

pub fn load_config_from_file_with_profile(path: &Path, data_dir: &Path, profile: &str) -> Result<AppConfig, AccordError> {
    info!("loading configuration path={} data_dir={} profile={}", path.display(), data_dir.display(), profile);

    // Extract once to reach `profiles.<name>` in the file.
    let base: AppConfig =
        figment_base(path).extract().map_err(|e| AccordError::ConfigError(format!("config extraction failed: {e}")))?;
    let overrides = profile_overrides(&base, profile)?;

    let mut config: AppConfig = figment_base(path)
        .merge(Serialized::from(overrides, Profile::Default))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| AccordError::ConfigError(format!("config extraction failed for profile '{profile}': {e}")))?;
    postprocess(&mut config, data_dir);
    debug!("configuration loaded profile={} storage_dir={}", profile, config.storage.data_dir);
    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    let figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment.merge(Toml::file(path))
    } else {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
        figment
    }
}

fn profile_overrides(config: &AppConfig, profile: &str) -> Result<Dict, AccordError> {
    let profiles = config.profiles.as_ref().ok_or_else(|| AccordError::ConfigError("no profiles section in config".to_string()))?;
    profiles.get(profile).cloned().ok_or_else(|| AccordError::ConfigError(format!("profile '{profile}' not found in config")))
}

fn postprocess(config: &mut AppConfig, data_dir: &Path) {
    if config.storage.data_dir.trim().is_empty() {
        config.storage.data_dir = data_dir.to_string_lossy().to_string();
    }
}
