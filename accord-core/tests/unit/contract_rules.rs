use crate::fixtures::*;
use accord_core::domain::contract::{validate_draft, ContractDraft, ContractSigner, ContractStatus, SignerInvite};
use accord_core::domain::linkage::{chain, latest_transaction_ref, verify_chain};
use accord_core::foundation::{ContractId, SignerRowId, UserId};

fn draft() -> ContractDraft {
    ContractDraft {
        name: "Lease".to_string(),
        description: Some("Flat 4B".to_string()),
        contract_type: TEST_CONTRACT_TYPE.to_string(),
        document_ref: "docs/lease.pdf".to_string(),
        genesis_tx_ref: tx(0xaa),
        creator_id: UserId::new(1),
    }
}

#[test]
fn draft_requires_signers_with_unique_emails() {
    assert!(validate_draft(&draft(), &[SignerInvite::new("a@example.com")]).is_ok());

    let errors = validate_draft(&draft(), &[]).expect_err("no signers");
    assert!(errors.iter().any(|e| e.contains("at least one signer")));

    let errors = validate_draft(&draft(), &[SignerInvite::new("a@example.com"), SignerInvite::new(" A@Example.com ")])
        .expect_err("duplicate");
    assert!(errors.iter().any(|e| e.contains("duplicate")));
}

#[test]
fn status_follows_signatures_monotonically() {
    let status = ContractStatus::Draft.after_signature(1, 3, false);
    assert_eq!(status, ContractStatus::Pending);
    let status = status.after_signature(2, 3, true);
    assert_eq!(status, ContractStatus::Signed);
    let status = status.after_signature(3, 3, true);
    assert_eq!(status, ContractStatus::Completed);
    assert_eq!(status.after_signature(1, 3, false), ContractStatus::Completed);
}

#[test]
fn chain_links_each_signature_to_its_predecessor() {
    let mut rows: Vec<ContractSigner> =
        (1..=3).map(|id| ContractSigner::pending(SignerRowId::new(id), ContractId::new(1), UserId::new(id), 0)).collect();
    rows[2].mark_signed(tx(3), tx(0xaa), 10);
    rows[0].mark_signed(tx(1), tx(3), 20);

    assert_eq!(latest_transaction_ref(tx(0xaa), &rows), tx(1));
    let order: Vec<u64> = chain(&rows).iter().map(|row| row.user_id.get()).collect();
    assert_eq!(order, vec![3, 1]);
    assert_eq!(verify_chain(tx(0xaa), &rows).expect("intact"), vec![tx(3), tx(1)]);

    rows[1].mark_signed(tx(2), tx(0xaa), 30);
    let broken = verify_chain(tx(0xaa), &rows).expect_err("fork");
    assert_eq!(broken.position, 2);
    assert_eq!(broken.expected_parent, tx(1));
}
