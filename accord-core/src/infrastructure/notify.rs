//! Outbound notifications for contract creation.

use crate::foundation::{AccordError, ContractId};
use async_trait::async_trait;
use log::info;
use secrecy::SecretString;

/// Invitation for a newly provisioned signer; carries the only copy of their password.
pub struct Invitation {
    pub contract_id: ContractId,
    pub contract_name: String,
    pub email: String,
    pub name: String,
    pub password: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCreatedNotice {
    pub contract_id: ContractId,
    pub contract_name: String,
    pub creator_email: String,
    pub signer_emails: Vec<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_invitation(&self, invitation: Invitation) -> Result<(), AccordError>;
    async fn send_contract_created(&self, notice: ContractCreatedNotice) -> Result<(), AccordError>;
}

/// Writes notices to the log. Passwords are never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_invitation(&self, invitation: Invitation) -> Result<(), AccordError> {
        info!("invitation issued contract_id={} email={}", invitation.contract_id, invitation.email);
        Ok(())
    }

    async fn send_contract_created(&self, notice: ContractCreatedNotice) -> Result<(), AccordError> {
        info!(
            "contract created contract_id={} name={} creator={} signers={}",
            notice.contract_id,
            notice.contract_name,
            notice.creator_email,
            notice.signer_emails.len()
        );
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::RecordingNotifier;

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Keeps every notification in memory; can be switched to fail.
    #[derive(Default)]
    pub struct RecordingNotifier {
        invitations: Mutex<Vec<Invitation>>,
        notices: Mutex<Vec<ContractCreatedNotice>>,
        failing: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn take_invitations(&self) -> Vec<Invitation> {
            std::mem::take(&mut *self.invitations.lock())
        }

        pub fn notices(&self) -> Vec<ContractCreatedNotice> {
            self.notices.lock().clone()
        }

        fn check(&self) -> Result<(), AccordError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AccordError::NotificationError("mail relay unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_invitation(&self, invitation: Invitation) -> Result<(), AccordError> {
            self.check()?;
            self.invitations.lock().push(invitation);
            Ok(())
        }

        async fn send_contract_created(&self, notice: ContractCreatedNotice) -> Result<(), AccordError> {
            self.check()?;
            self.notices.lock().push(notice);
            Ok(())
        }
    }
}
