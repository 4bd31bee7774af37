mod loader;
mod types;
pub mod validation;

pub use loader::{load_config, load_config_from_file, load_config_from_file_with_profile, load_config_with_profile, CONFIG_FILE_NAME};
pub use types::*;

use crate::foundation::AccordError;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "ACCORD_DATA_DIR";
pub const CONFIG_PATH_ENV: &str = "ACCORD_CONFIG_PATH";

pub fn resolve_data_dir() -> PathBuf {
    std::env::var(DATA_DIR_ENV)
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".accord"))
}

/// Loads from `ACCORD_CONFIG_PATH` (or the data dir default) and validates.
pub fn load_app_config() -> Result<AppConfig, AccordError> {
    let data_dir = resolve_data_dir();
    let config = match std::env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.trim().is_empty()) {
        Some(path) => load_config_from_file(&PathBuf::from(path), &data_dir)?,
        None => load_config(&data_dir)?,
    };
    config.validate().map_err(|errors| AccordError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    Ok(config)
}
