//! Infrastructure layer: storage, ledger access, credentials, notifications, config, logging.

pub mod config;
pub mod credentials;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod storage;
