use crate::fixtures::*;
use accord_core::domain::record::decode_record;
use accord_core::domain::{is_complete, ContractStatus, SignerStatus};
use accord_core::foundation::{AccordError, ReconciliationError, RegistryError, SubmissionError, UserId};
use accord_core::infrastructure::ledger::{SubmitFault, TxStatus};
use std::time::Duration;

#[tokio::test]
async fn two_of_three_progresses_through_statuses() {
    let harness = Harness::memory();
    let fixture = harness.contract("scenario-d", 3, 2).await;
    let (a, b, c) = (fixture.signer_ids[0], fixture.signer_ids[1], fixture.signer_ids[2]);

    let first = harness.orchestrator.sign_contract(fixture.contract_id, a).await.expect("a signs");
    let details = harness.registry.get_contract(fixture.contract_id).expect("details");
    assert_eq!(details.contract.status, ContractStatus::Pending);
    assert_eq!(details.latest_tx_ref, first);
    assert_eq!(harness.registry.signer_status(fixture.contract_id, a).expect("status"), SignerStatus::Signed);
    assert_eq!(harness.registry.signer_status(fixture.contract_id, c).expect("status"), SignerStatus::Pending);

    let second = harness.orchestrator.sign_contract(fixture.contract_id, b).await.expect("b signs");
    let details = harness.registry.get_contract(fixture.contract_id).expect("details");
    assert_eq!(details.contract.status, ContractStatus::Signed);
    let landed = decode_record(&harness.ledger.record_at(&second).expect("record on ledger")).expect("decode");
    assert!(is_complete(&landed));
    assert_eq!(landed.signatures_collected, vec![fixture.keys[0].clone(), fixture.keys[1].clone()]);

    let third = harness.orchestrator.sign_contract(fixture.contract_id, c).await.expect("c signs");
    let details = harness.registry.get_contract(fixture.contract_id).expect("details");
    assert_eq!(details.contract.status, ContractStatus::Completed);

    let verification = harness.registry.verify_chain(fixture.contract_id).expect("verify");
    assert!(verification.is_intact());
    assert_eq!(verification.links, vec![first, second, third]);
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), Some(first));
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_none());
}

#[tokio::test]
async fn rejects_repeat_and_unknown_signers() {
    let harness = Harness::memory();
    let fixture = harness.contract("guards", 2, 1).await;
    let signer = fixture.signer_ids[0];

    harness.orchestrator.sign_contract(fixture.contract_id, signer).await.expect("first signature");
    let err = harness.orchestrator.sign_contract(fixture.contract_id, signer).await.expect_err("repeat");
    assert!(matches!(err, AccordError::Registry(RegistryError::AlreadySigned { .. })));

    let err = harness.orchestrator.sign_contract(fixture.contract_id, fixture.creator_id).await.expect_err("creator is not a signer");
    assert!(matches!(err, AccordError::Registry(RegistryError::SignerNotFound { .. })));

    let err = harness.orchestrator.sign_contract(fixture.contract_id, UserId::new(9_999)).await.expect_err("unknown user");
    assert!(matches!(err, AccordError::Registry(RegistryError::SignerNotFound { .. })));
    assert_eq!(harness.ledger.submit_calls(), 1);
}

#[tokio::test]
async fn signer_without_key_hash_is_refused_before_submission() {
    let harness = Harness::memory();
    let fixture = harness.contract("keyless", 1, 1).await;
    let row = harness
        .registry
        .add_signer(fixture.contract_id, accord_core::domain::SignerInvite::new(Harness::email("keyless", "late")))
        .await
        .expect("add signer");

    let err = harness.orchestrator.sign_contract(fixture.contract_id, row.user_id).await.expect_err("no key");
    assert!(matches!(err, AccordError::Registry(RegistryError::SignerKeyUnknown(_))));
    assert_eq!(harness.ledger.submit_calls(), 0);
}

#[tokio::test]
async fn rejection_leaves_row_pending_and_journal_empty() {
    let harness = Harness::memory();
    let fixture = harness.contract("rejected", 2, 2).await;
    harness.ledger.push_fault(SubmitFault::Reject("collateral missing".to_string()));

    let err = harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[0]).await.expect_err("rejected");
    assert!(matches!(err, AccordError::Submission(SubmissionError::Rejected(_))));
    assert_eq!(harness.registry.signer_status(fixture.contract_id, fixture.signer_ids[0]).expect("status"), SignerStatus::Pending);
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_none());
    assert_eq!(harness.registry.latest_transaction_ref(fixture.contract_id).expect("latest"), fixture.genesis);

    harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[0]).await.expect("retry by caller");
}

#[tokio::test]
async fn timeout_after_acceptance_is_recorded_without_resubmitting() {
    let harness = Harness::memory();
    let fixture = harness.contract("late-ack", 2, 2).await;
    harness.ledger.push_fault(SubmitFault::TimeoutAfterAccept);

    let tx_ref = harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[0]).await.expect("resolved");
    assert_eq!(harness.ledger.submit_calls(), 1);
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), Some(tx_ref));
    assert_eq!(harness.registry.latest_transaction_ref(fixture.contract_id).expect("latest"), tx_ref);
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_none());
}

#[tokio::test]
async fn timeout_before_acceptance_is_retried() {
    let harness = Harness::rocks();
    let fixture = harness.contract("lost", 2, 2).await;
    harness.ledger.push_fault(SubmitFault::TimeoutBeforeAccept);

    let tx_ref = harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[1]).await.expect("second attempt");
    assert_eq!(harness.ledger.submit_calls(), 2);
    assert_eq!(harness.ledger.submissions().len(), 1);
    assert_eq!(harness.registry.latest_transaction_ref(fixture.contract_id).expect("latest"), tx_ref);
}

#[tokio::test]
async fn exhausted_attempts_keep_the_journal_entry() {
    let harness = Harness::memory();
    let fixture = harness.contract("offline", 1, 1).await;
    for _ in 0..test_ledger_config().max_submit_attempts {
        harness.ledger.push_fault(SubmitFault::Unavailable);
    }

    let err = harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[0]).await.expect_err("offline");
    assert!(matches!(err, AccordError::Submission(SubmissionError::Unavailable(_))));
    let intent = harness.storage.get_intent(fixture.contract_id).expect("read").expect("journaled");
    assert_eq!(intent.attempts, test_ledger_config().max_submit_attempts);
    assert_eq!(intent.submitted, None);

    // The next call finds nothing landed, drops the stale entry and signs.
    harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[0]).await.expect("ledger back");
    assert_eq!(harness.registry.get_contract(fixture.contract_id).expect("details").contract.status, ContractStatus::Completed);
}

#[tokio::test]
async fn pending_confirmation_is_finished_by_the_reconciler() {
    let harness = Harness::memory();
    let fixture = harness.contract("slow-block", 2, 1).await;
    harness.ledger.set_new_status(TxStatus::Pending);
    harness.ledger.push_fault(SubmitFault::TimeoutAfterAccept);

    let err = harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[0]).await.expect_err("pending");
    let AccordError::Submission(SubmissionError::Pending { tx_ref }) = err else {
        panic!("expected pending, got {err}");
    };
    let intent = harness.storage.get_intent(fixture.contract_id).expect("read").expect("journaled");
    assert_eq!(intent.submitted, Some(tx_ref));
    assert_eq!(harness.registry.signer_status(fixture.contract_id, fixture.signer_ids[0]).expect("status"), SignerStatus::Pending);

    let report = harness.reconciler.reconcile_once().await.expect("sweep");
    assert_eq!(report.pending, 1);
    assert!(report.recorded.is_empty());

    harness.ledger.set_status(tx_ref, TxStatus::Confirmed);
    let report = harness.reconciler.reconcile_once().await.expect("sweep");
    assert_eq!(report.recorded, vec![(fixture.contract_id, fixture.signer_ids[0], tx_ref)]);
    assert_eq!(harness.registry.latest_transaction_ref(fixture.contract_id).expect("latest"), tx_ref);
    assert_eq!(harness.registry.get_contract(fixture.contract_id).expect("details").contract.status, ContractStatus::Signed);
}

#[tokio::test]
async fn cancelled_call_leaves_row_pending_and_next_call_signs() {
    let harness = Harness::memory();
    let fixture = harness.contract("cancelled", 2, 2).await;
    let signer = fixture.signer_ids[0];
    harness.ledger.push_fault(SubmitFault::Delay(Duration::from_millis(150)));

    let outcome = tokio::time::timeout(Duration::from_millis(20), harness.orchestrator.sign_contract(fixture.contract_id, signer)).await;
    assert!(outcome.is_err(), "call should have been cancelled");
    assert_eq!(harness.registry.signer_status(fixture.contract_id, signer).expect("status"), SignerStatus::Pending);
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_some());
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), None);

    let tx_ref = harness.orchestrator.sign_contract(fixture.contract_id, signer).await.expect("sign after cancel");
    assert_eq!(harness.registry.signer_status(fixture.contract_id, signer).expect("status"), SignerStatus::Signed);
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), Some(tx_ref));
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_none());
}

#[tokio::test]
async fn landed_retry_stays_journaled_while_unconfirmed() {
    let harness = Harness::memory();
    let fixture = harness.contract("lagging-index", 2, 1).await;
    let signer = fixture.signer_ids[0];
    harness.ledger.set_new_status(TxStatus::Pending);
    harness.ledger.push_fault(SubmitFault::TimeoutAfterAccept);
    // The first lookup after the timeout misses the spend, so a second submission goes out.
    harness.ledger.lag_successor_lookups(1);

    let err = harness.orchestrator.sign_contract(fixture.contract_id, signer).await.expect_err("pending");
    let AccordError::Submission(SubmissionError::Pending { tx_ref }) = err else {
        panic!("expected pending, got {err}");
    };
    assert_eq!(harness.ledger.submit_calls(), 2);
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), Some(tx_ref));
    let intent = harness.storage.get_intent(fixture.contract_id).expect("read").expect("journaled");
    assert_eq!(intent.submitted, Some(tx_ref));
    assert_eq!(harness.registry.latest_transaction_ref(fixture.contract_id).expect("latest"), fixture.genesis);

    harness.ledger.set_status(tx_ref, TxStatus::Confirmed);
    let report = harness.reconciler.reconcile_once().await.expect("sweep");
    assert_eq!(report.scanned, 1);
    assert_eq!(report.recorded, vec![(fixture.contract_id, signer, tx_ref)]);
    assert_eq!(harness.registry.latest_transaction_ref(fixture.contract_id).expect("latest"), tx_ref);
    assert_eq!(harness.registry.signer_status(fixture.contract_id, signer).expect("status"), SignerStatus::Signed);
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_none());
}

#[tokio::test]
async fn landed_retry_confirmed_is_recorded_immediately() {
    let harness = Harness::rocks();
    let fixture = harness.contract("lagging-confirmed", 2, 2).await;
    harness.ledger.push_fault(SubmitFault::TimeoutAfterAccept);
    harness.ledger.lag_successor_lookups(1);

    let tx_ref = harness.orchestrator.sign_contract(fixture.contract_id, fixture.signer_ids[0]).await.expect("resolved");
    assert_eq!(harness.ledger.submit_calls(), 2);
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), Some(tx_ref));
    assert_eq!(harness.registry.latest_transaction_ref(fixture.contract_id).expect("latest"), tx_ref);
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_none());
}

#[tokio::test]
async fn retry_blocked_by_foreign_spend_reports_divergence() {
    let harness = Harness::memory();
    let fixture = harness.contract("foreign-retry", 2, 2).await;
    let signer = fixture.signer_ids[1];
    let foreign = harness.ledger.spend_outside(fixture.genesis, b"not our record".to_vec());
    harness.ledger.push_fault(SubmitFault::TimeoutBeforeAccept);
    harness.ledger.lag_successor_lookups(1);

    let err = harness.orchestrator.sign_contract(fixture.contract_id, signer).await.expect_err("diverged");
    assert!(matches!(err, AccordError::Reconciliation(ReconciliationError::ChainDiverged { .. })), "got {err}");
    assert_eq!(harness.ledger.submit_calls(), 2);
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), Some(foreign));
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_some());
    assert_eq!(harness.registry.signer_status(fixture.contract_id, signer).expect("status"), SignerStatus::Pending);

    let report = harness.reconciler.reconcile_once().await.expect("sweep");
    assert_eq!(report.diverged, vec![fixture.contract_id]);
}

#[tokio::test]
async fn retry_rejected_with_nothing_landed_clears_journal() {
    let harness = Harness::memory();
    let fixture = harness.contract("missing-retry", 2, 2).await;
    let signer = fixture.signer_ids[0];
    harness.ledger.push_fault(SubmitFault::TimeoutBeforeAccept);
    harness.ledger.push_fault(SubmitFault::Reject("fee too low".to_string()));

    let err = harness.orchestrator.sign_contract(fixture.contract_id, signer).await.expect_err("rejected");
    assert!(matches!(err, AccordError::Submission(SubmissionError::Rejected(_))));
    assert_eq!(harness.ledger.submit_calls(), 2);
    assert_eq!(harness.ledger.successor_of(&fixture.genesis), None);
    assert!(harness.storage.get_intent(fixture.contract_id).expect("intent").is_none());

    harness.orchestrator.sign_contract(fixture.contract_id, signer).await.expect("caller retries");
    assert_eq!(harness.registry.signer_status(fixture.contract_id, signer).expect("status"), SignerStatus::Signed);
}
