//! Application layer: orchestration across domain logic and infrastructure I/O.

mod landing;
pub mod locks;
pub mod orchestrator;
pub mod reconciliation;
pub mod registry;

pub use locks::ContractLocks;
pub use orchestrator::SigningOrchestrator;
pub use reconciliation::{ReconcileReport, Reconciler};
pub use registry::{ChainVerification, ContractDetails, ContractFilter, ContractRegistry, Page};
