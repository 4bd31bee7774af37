use crate::fixtures::*;
use accord_core::domain::{ContractDraft, ContractStatus, SignerInvite, SignerStatus, SubmissionIntent};
use accord_core::foundation::{AccordError, ErrorClass, RegistryError, UserId};
use accord_core::infrastructure::storage::{
    ContractCreation, MemoryStorage, NewUser, RegistryStorage, RocksStorage, SignatureWrite, SignerSlot,
};
use tempfile::TempDir;

fn new_user(email: &str) -> NewUser {
    NewUser { email: email.to_string(), name: email.to_string(), password_hash: "$argon2id$stub".to_string(), created_at_nanos: 1 }
}

fn draft(creator_id: UserId, genesis: u8) -> ContractDraft {
    ContractDraft {
        name: "Lease".to_string(),
        description: None,
        contract_type: TEST_CONTRACT_TYPE.to_string(),
        document_ref: "docs/lease.pdf".to_string(),
        genesis_tx_ref: tx(genesis),
        creator_id,
    }
}

fn signature(contract: &accord_core::domain::Contract, user_id: UserId, tx_byte: u8, at: u64) -> SignatureWrite {
    SignatureWrite {
        contract_id: contract.id,
        user_id,
        tx_ref: tx(tx_byte),
        expected_parent: None,
        threshold_reached: false,
        signed_at_nanos: at,
    }
}

fn creation_is_atomic(storage: &dyn RegistryStorage) {
    let creator = storage.insert_user(new_user("creator@example.com")).expect("creator");
    let existing = storage.insert_user(new_user("taken@example.com")).expect("existing");

    // The second provision collides with a registered email, so nothing may be written.
    let slots = vec![SignerSlot::Provision(new_user("fresh@example.com")), SignerSlot::Provision(new_user("TAKEN@example.com"))];
    let err = storage.create_contract(ContractCreation { draft: draft(creator.id, 1), slots, now_nanos: 5 }).expect_err("collision");
    assert!(matches!(&err, AccordError::Registry(RegistryError::DuplicateEmail { email }) if email == "taken@example.com"));
    assert!(storage.get_user_by_email("fresh@example.com").expect("lookup").is_none());
    assert!(storage.list_contracts().expect("list").is_empty());
    assert!(storage.find_contract_by_genesis(&tx(1)).expect("lookup").is_none());

    let slots = vec![SignerSlot::Provision(new_user("fresh@example.com")), SignerSlot::Existing(existing.id), SignerSlot::Existing(existing.id)];
    let created = storage.create_contract(ContractCreation { draft: draft(creator.id, 1), slots, now_nanos: 5 }).expect("create");
    assert_eq!(created.contract.status, ContractStatus::Draft);
    assert_eq!(created.signers.len(), 2);
    assert_eq!(created.provisioned.len(), 1);
    assert!(created.signers.iter().all(|row| row.status == SignerStatus::Pending));

    let err = storage
        .create_contract(ContractCreation { draft: draft(creator.id, 1), slots: vec![SignerSlot::Existing(existing.id)], now_nanos: 6 })
        .expect_err("duplicate genesis");
    assert!(matches!(err, AccordError::Registry(RegistryError::DuplicateGenesis(_))));
}

fn signatures_link_and_status_advances(storage: &dyn RegistryStorage) {
    let creator = storage.insert_user(new_user("creator@example.com")).expect("creator");
    let a = storage.insert_user(new_user("a@example.com")).expect("a");
    let b = storage.insert_user(new_user("b@example.com")).expect("b");
    let slots = vec![SignerSlot::Existing(a.id), SignerSlot::Existing(b.id)];
    let contract = storage.create_contract(ContractCreation { draft: draft(creator.id, 0xaa), slots, now_nanos: 1 }).expect("create").contract;

    let first = storage.record_signature(signature(&contract, b.id, 2, 100)).expect("b signs");
    assert_eq!(first.signer.parent_tx_ref, Some(tx(0xaa)));
    assert_eq!(first.contract.status, ContractStatus::Pending);

    let mut stale = signature(&contract, a.id, 1, 100);
    stale.expected_parent = Some(tx(0xaa));
    let err = storage.record_signature(stale).expect_err("stale parent");
    assert!(matches!(err, AccordError::Registry(RegistryError::ChainConflict { .. })));

    let mut fresh = signature(&contract, a.id, 1, 100);
    fresh.expected_parent = Some(tx(2));
    let second = storage.record_signature(fresh).expect("a signs");
    assert_eq!(second.signer.parent_tx_ref, Some(tx(2)));
    assert!(second.signer.signed_at_nanos > first.signer.signed_at_nanos);
    assert_eq!(second.contract.status, ContractStatus::Completed);

    let err = storage.record_signature(signature(&contract, a.id, 3, 200)).expect_err("twice");
    assert!(matches!(err, AccordError::Registry(RegistryError::AlreadySigned { .. })));
    let err = storage.remove_signer(contract.id, a.id).expect_err("signed rows stay");
    assert!(matches!(err, AccordError::Registry(RegistryError::SignerNotRemovable { .. })));
}

fn signer_management_and_cascade(storage: &dyn RegistryStorage) {
    let creator = storage.insert_user(new_user("creator@example.com")).expect("creator");
    let a = storage.insert_user(new_user("a@example.com")).expect("a");
    let c = storage.insert_user(new_user("c@example.com")).expect("c");
    let contract = storage
        .create_contract(ContractCreation { draft: draft(creator.id, 7), slots: vec![SignerSlot::Existing(a.id)], now_nanos: 1 })
        .expect("create")
        .contract;

    storage.add_signer(contract.id, SignerSlot::Existing(c.id), 2).expect("add");
    let err = storage.add_signer(contract.id, SignerSlot::Existing(c.id), 3).expect_err("duplicate");
    assert!(matches!(err, AccordError::Registry(RegistryError::DuplicateSigner { .. })));
    let order: Vec<UserId> = storage.list_signers(contract.id).expect("list").iter().map(|row| row.user_id).collect();
    assert_eq!(order, vec![a.id, c.id]);
    assert_eq!(storage.contracts_for_signer(c.id).expect("for signer"), vec![contract.id]);

    storage.remove_signer(contract.id, c.id).expect("remove pending");
    assert!(storage.get_signer(contract.id, c.id).expect("get").is_none());

    let intent = SubmissionIntent {
        contract_id: contract.id,
        user_id: a.id,
        previous: tx(7),
        record: vec![1, 2, 3],
        created_at_nanos: 1,
        submitted: None,
        attempts: 1,
    };
    storage.put_intent(&intent).expect("journal");
    assert_eq!(storage.list_intents().expect("intents"), vec![intent]);

    assert!(storage.delete_contract(contract.id).expect("delete"));
    assert!(storage.get_contract(contract.id).expect("get").is_none());
    assert!(storage.list_signers(contract.id).expect("signers").is_empty());
    assert!(storage.list_intents().expect("intents").is_empty());
    assert!(storage.find_contract_by_genesis(&tx(7)).expect("genesis").is_none());
    assert!(!storage.delete_contract(contract.id).expect("second delete"));
}

fn duplicate_email_is_a_conflict(storage: &dyn RegistryStorage) {
    storage.insert_user(new_user("dup@example.com")).expect("first");
    let err = storage.insert_user(new_user(" Dup@Example.com ")).expect_err("second");
    assert!(matches!(&err, AccordError::Registry(RegistryError::DuplicateEmail { email }) if email == "dup@example.com"));
    assert_eq!(err.class(), ErrorClass::Conflict);
}

fn provisioned_signer_is_written_with_its_row(storage: &dyn RegistryStorage) {
    let creator = storage.insert_user(new_user("creator@example.com")).expect("creator");
    let taken = storage.insert_user(new_user("taken@example.com")).expect("taken");
    let contract = storage
        .create_contract(ContractCreation { draft: draft(creator.id, 3), slots: vec![SignerSlot::Existing(taken.id)], now_nanos: 1 })
        .expect("create")
        .contract;

    // The row cannot be added, so the new user must not exist either.
    let missing = accord_core::foundation::ContractId::new(contract.id.get() + 100);
    let err = storage.add_signer(missing, SignerSlot::Provision(new_user("late@example.com")), 2).expect_err("no contract");
    assert!(matches!(err, AccordError::Registry(RegistryError::ContractNotFound(_))));
    assert!(storage.get_user_by_email("late@example.com").expect("lookup").is_none());

    let err = storage.add_signer(contract.id, SignerSlot::Provision(new_user("TAKEN@example.com")), 2).expect_err("taken");
    assert!(matches!(err, AccordError::Registry(RegistryError::DuplicateEmail { .. })));
    assert_eq!(storage.list_signers(contract.id).expect("list").len(), 1);

    let added = storage.add_signer(contract.id, SignerSlot::Provision(new_user("late@example.com")), 3).expect("add");
    let user = added.provisioned.expect("provisioned user");
    assert_eq!(added.signer.user_id, user.id);
    assert_eq!(storage.get_user_by_email("late@example.com").expect("lookup").map(|u| u.id), Some(user.id));
    assert_eq!(storage.contracts_for_signer(user.id).expect("for signer"), vec![contract.id]);
}

#[test]
fn memory_storage_reports_duplicate_email() {
    duplicate_email_is_a_conflict(&MemoryStorage::new());
}

#[test]
fn rocks_storage_reports_duplicate_email() {
    let dir = TempDir::new().expect("temp dir");
    duplicate_email_is_a_conflict(&RocksStorage::open_in_dir(dir.path()).expect("open"));
}

#[test]
fn memory_storage_provisions_signer_atomically() {
    provisioned_signer_is_written_with_its_row(&MemoryStorage::new());
}

#[test]
fn rocks_storage_provisions_signer_atomically() {
    let dir = TempDir::new().expect("temp dir");
    provisioned_signer_is_written_with_its_row(&RocksStorage::open_in_dir(dir.path()).expect("open"));
}

#[test]
fn memory_storage_creation_is_atomic() {
    creation_is_atomic(&MemoryStorage::new());
}

#[test]
fn rocks_storage_creation_is_atomic() {
    let dir = TempDir::new().expect("temp dir");
    creation_is_atomic(&RocksStorage::open_in_dir(dir.path()).expect("open"));
}

#[test]
fn memory_storage_links_signatures() {
    signatures_link_and_status_advances(&MemoryStorage::new());
}

#[test]
fn rocks_storage_links_signatures() {
    let dir = TempDir::new().expect("temp dir");
    signatures_link_and_status_advances(&RocksStorage::open_in_dir(dir.path()).expect("open"));
}

#[test]
fn memory_storage_manages_signers() {
    signer_management_and_cascade(&MemoryStorage::new());
}

#[test]
fn rocks_storage_manages_signers() {
    let dir = TempDir::new().expect("temp dir");
    signer_management_and_cascade(&RocksStorage::open_in_dir(dir.path()).expect("open"));
}

#[test]
fn rocks_storage_survives_reopen_and_checkpoint() {
    let dir = TempDir::new().expect("temp dir");
    let checkpoint_dir = TempDir::new().expect("checkpoint dir");
    let contract_id = {
        let storage = RocksStorage::open_in_dir(dir.path()).expect("open");
        let creator = storage.insert_user(new_user("creator@example.com")).expect("creator");
        let a = storage.insert_user(new_user("a@example.com")).expect("a");
        let contract = storage
            .create_contract(ContractCreation { draft: draft(creator.id, 9), slots: vec![SignerSlot::Existing(a.id)], now_nanos: 1 })
            .expect("create")
            .contract;
        storage.record_signature(signature(&contract, a.id, 4, 10)).expect("sign");
        storage.create_checkpoint(checkpoint_dir.path()).expect("checkpoint");
        contract.id
    };

    let reopened = RocksStorage::open_in_dir(dir.path()).expect("reopen");
    let rows = reopened.list_signers(contract_id).expect("signers");
    assert_eq!(rows[0].tx_ref, Some(tx(4)));
    // Id counters persist: the next user must not reuse an id.
    let next = reopened.insert_user(new_user("b@example.com")).expect("b");
    assert!(next.id.get() > 2);

    let restored = RocksStorage::open(checkpoint_dir.path()).expect("open checkpoint");
    assert_eq!(restored.get_contract(contract_id).expect("get").map(|c| c.status), Some(ContractStatus::Completed));
}

#[tokio::test]
async fn invited_signer_authenticates_with_delivered_password() {
    use secrecy::ExposeSecret;

    let harness = Harness::memory();
    let fixture = harness.contract("invite", 2, 2).await;
    let invitations = harness.notifier.take_invitations();
    assert_eq!(invitations.len(), 2);
    assert!(invitations.iter().all(|invite| invite.contract_id == fixture.contract_id));

    let notices = harness.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].signer_emails.len(), 2);

    let invite = &invitations[0];
    let user = harness.registry.authenticate(&invite.email, invite.password.expose_secret()).expect("auth").expect("match");
    assert_eq!(user.id, fixture.signer_ids[0]);
    assert_eq!(user.name, invite.email);
    assert!(!user.password_hash.contains(invite.password.expose_secret().as_str()));
    assert!(harness.registry.authenticate(&invite.email, "wrong-password").expect("auth").is_none());
}

#[tokio::test]
async fn failed_readd_keeps_single_provisioned_user() {
    let harness = Harness::rocks();
    let fixture = harness.contract("reinvite", 1, 1).await;
    harness.notifier.take_invitations();
    let email = Harness::email("reinvite", "late");

    let row = harness.registry.add_signer(fixture.contract_id, SignerInvite::new(email.clone())).await.expect("add");
    let err = harness.registry.add_signer(fixture.contract_id, SignerInvite::new(email.clone())).await.expect_err("duplicate");
    assert!(matches!(err, AccordError::Registry(RegistryError::DuplicateSigner { .. })));
    assert_eq!(harness.notifier.take_invitations().len(), 1);

    let err = harness
        .registry
        .register_user(&email, "Late", &secrecy::SecretString::new("late-password".to_string()))
        .expect_err("already provisioned");
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert_eq!(harness.storage.get_user_by_email(&email).expect("lookup").map(|u| u.id), Some(row.user_id));
}

#[tokio::test]
async fn notifier_outage_does_not_fail_creation() {
    let harness = Harness::memory();
    harness.notifier.set_failing(true);
    let fixture = harness.contract("outage", 2, 1).await;

    let details = harness.registry.find_by_genesis(&fixture.genesis).expect("by genesis");
    assert_eq!(details.contract.id, fixture.contract_id);
    assert_eq!(details.signers.len(), 2);
    assert!(harness.notifier.take_invitations().is_empty());
}

#[tokio::test]
async fn lists_newest_first_with_filters() {
    use accord_core::application::ContractFilter;

    let harness = Harness::memory();
    let first = harness.contract("list-a", 1, 1).await;
    let second = harness.contract("list-b", 1, 1).await;
    harness.orchestrator.sign_contract(second.contract_id, second.signer_ids[0]).await.expect("sign");

    let page = harness.registry.list_contracts(&ContractFilter::default()).expect("list");
    assert_eq!(page.total, 2);
    assert_eq!(page.items.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.contract_id, first.contract_id]);

    let completed = ContractFilter { status: Some(ContractStatus::Completed), ..Default::default() };
    let page = harness.registry.list_contracts(&completed).expect("list");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, second.contract_id);

    let by_creator = ContractFilter { creator_id: Some(first.creator_id), limit: 1_000, ..Default::default() };
    let page = harness.registry.list_contracts(&by_creator).expect("list");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.limit, accord_core::foundation::MAX_PAGE_LIMIT);

    let mine = harness.registry.contracts_for_user(second.signer_ids[0]).expect("for user");
    assert_eq!(mine.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.contract_id]);

    harness.registry.delete_contract(first.contract_id).expect("delete");
    let err = harness.registry.get_contract(first.contract_id).expect_err("gone");
    assert!(matches!(err, AccordError::Registry(RegistryError::ContractNotFound(_))));
}

#[tokio::test]
async fn wallet_binds_on_first_verification() {
    let harness = Harness::memory();
    let fixture = harness.contract("wallet", 1, 1).await;
    let user_id = fixture.signer_ids[0];

    let user = harness.registry.verify_user_wallet(user_id, "addr_test1qwallet").expect("bind");
    assert_eq!(user.wallet_address.as_deref(), Some("addr_test1qwallet"));
    harness.registry.verify_user_wallet(user_id, "addr_test1qwallet").expect("same wallet");
    let err = harness.registry.verify_user_wallet(user_id, "addr_test1qother").expect_err("mismatch");
    assert!(matches!(err, AccordError::Registry(RegistryError::WalletMismatch(_))));
}

#[tokio::test]
async fn manual_status_advance_never_moves_backwards() {
    let harness = Harness::rocks();
    let fixture = harness.contract("status", 2, 2).await;

    let contract = harness.registry.advance_status(fixture.contract_id, ContractStatus::Pending).expect("advance");
    assert_eq!(contract.status, ContractStatus::Pending);
    let contract = harness.registry.advance_status(fixture.contract_id, ContractStatus::Draft).expect("no-op");
    assert_eq!(contract.status, ContractStatus::Pending);
}
