pub mod model;
pub mod validation;

pub use model::{
    normalize_email, Contract, ContractDraft, ContractSigner, ContractStatus, SignerInvite, SignerStatus, SubmissionIntent, User,
};
pub use validation::{validate_draft, validate_email};
