//! Domain layer: pure signing logic with no I/O.

pub mod contract;
pub mod linkage;
pub mod plutus;
pub mod record;
pub mod transition;

pub use contract::{Contract, ContractDraft, ContractSigner, ContractStatus, SignerInvite, SignerStatus, SubmissionIntent, User};
pub use record::{StructuredRecord, TransitionAction, TransitionRequest};
pub use transition::{can_sign, is_complete, signing_progress, validate_record, SigningProgress};
