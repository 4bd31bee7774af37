use super::model::{normalize_email, ContractDraft, SignerInvite};
use crate::foundation::{MAX_CONTRACT_NAME_LENGTH, MAX_CONTRACT_SIGNERS, MAX_EMAIL_LENGTH};
use std::collections::HashSet;

/// Creation-time checks on a contract draft and its signer list.
pub fn validate_draft(draft: &ContractDraft, invites: &[SignerInvite]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let name = draft.name.trim();
    if name.is_empty() {
        errors.push("name is required".to_string());
    } else if name.len() > MAX_CONTRACT_NAME_LENGTH {
        errors.push(format!("name exceeds {} characters", MAX_CONTRACT_NAME_LENGTH));
    }
    if draft.contract_type.trim().is_empty() {
        errors.push("contract_type is required".to_string());
    }
    if draft.document_ref.trim().is_empty() {
        errors.push("document_ref is required".to_string());
    }
    if draft.genesis_tx_ref.as_hash().iter().all(|byte| *byte == 0) {
        errors.push("genesis_tx_ref must not be zero".to_string());
    }

    if invites.is_empty() {
        errors.push("at least one signer is required".to_string());
    } else if invites.len() > MAX_CONTRACT_SIGNERS {
        errors.push(format!("at most {} signers are allowed", MAX_CONTRACT_SIGNERS));
    }

    let mut seen = HashSet::new();
    for invite in invites {
        let email = normalize_email(&invite.email);
        if let Err(reason) = validate_email(&email) {
            errors.push(format!("signer email '{}': {}", invite.email, reason));
            continue;
        }
        if !seen.insert(email) {
            errors.push(format!("duplicate signer email '{}'", invite.email));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("empty");
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err("too long");
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') && !domain.starts_with('.') => Ok(()),
        _ => Err("not an email address"),
    }
}
