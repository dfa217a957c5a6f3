//! End-to-end sign and validate scenarios over an in-memory replica.

use lseal_integration_tests::TestReplica;
use lseal_orchestrator::{ErrorClass, OrchestratorError};
use lseal_types::Lseq;

#[test]
fn test_empty_log() {
    let replica = TestReplica::new(100);

    assert!(matches!(
        replica.signer().sign_new(),
        Err(OrchestratorError::NoNewEntities)
    ));
    assert!(matches!(
        replica.validator().validate_from_lseq(None, None),
        Err(OrchestratorError::NoNewEntities)
    ));
}

#[test]
fn test_sign_then_validate() {
    let replica = TestReplica::new(100);
    replica.append_all(&[("a", "x"), ("b", "y"), ("c", "z")]);

    assert_eq!(replica.sign_all(), vec![3]);

    let progress = replica.validator().validate_from_lseq(None, None).unwrap();
    assert_eq!(progress.last_lseq, Lseq::from("3"));
    assert_eq!(progress.validated, 3);
    assert_eq!(progress.resume_hash, replica.checkpoint_hash());
}

#[test]
fn test_overwritten_record_is_detected() {
    let replica = TestReplica::new(100);
    replica.append_all(&[("a", "x"), ("b", "y"), ("c", "z")]);
    replica.sign_all();

    replica.forge_record(&Lseq::from("2"));

    let err = replica.validator().validate_all().unwrap_err();
    match &err {
        OrchestratorError::ValidationFailed { lseq } => assert_eq!(lseq, &Lseq::from("2")),
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
    assert_eq!(err.class(), ErrorClass::Tampered);
}

#[test]
fn test_overwritten_entry_is_detected() {
    let replica = TestReplica::new(100);
    replica.append_all(&[("a", "x"), ("b", "y"), ("c", "z")]);
    replica.sign_all();

    replica.tamper_entry(&Lseq::from("2"), b"forged");

    assert!(matches!(
        replica.validator().validate_all(),
        Err(OrchestratorError::ValidationFailed { lseq }) if lseq == Lseq::from("2")
    ));
}

#[test]
fn test_truncated_tail_is_detected() {
    let replica = TestReplica::new(100);
    replica.append_all(&[("a", "x"), ("b", "y"), ("c", "z")]);
    replica.sign_all();
    replica.signer().hash_and_sign().unwrap();

    replica.truncate_entry(&Lseq::from("3"));

    let err = replica.validator().validate_all().unwrap_err();
    match &err {
        OrchestratorError::Truncated { checkpoint } => assert_eq!(checkpoint, &Lseq::from("3")),
        other => panic!("expected Truncated, got {other:?}"),
    }
    assert_eq!(err.class(), ErrorClass::Tampered);
    assert!(matches!(
        replica.validator().validate_snapshot(),
        Err(OrchestratorError::SnapshotMismatch)
    ));

    // The signer cannot resume past a checkpoint that left the log, and
    // retrying never helps.
    let err = replica.signer().sign_new().unwrap_err();
    assert_eq!(err.class(), ErrorClass::Corruption);
}

#[test]
fn test_fully_truncated_log_is_detected() {
    let replica = TestReplica::new(2);
    let lseqs = replica.append_generated(3, 5);
    replica.sign_all();
    for lseq in &lseqs {
        replica.truncate_entry(lseq);
    }

    assert!(matches!(
        replica.validator().validate_all(),
        Err(OrchestratorError::Truncated { checkpoint }) if Some(&checkpoint) == lseqs.last()
    ));
}

#[test]
fn test_truncated_middle_entry_breaks_the_chain() {
    let replica = TestReplica::new(100);
    replica.append_all(&[("a", "x"), ("b", "y"), ("c", "z")]);
    replica.sign_all();

    replica.truncate_entry(&Lseq::from("2"));

    assert!(matches!(
        replica.validator().validate_all(),
        Err(OrchestratorError::ValidationFailed { lseq }) if lseq == Lseq::from("3")
    ));
}

#[test]
fn test_paged_signing_matches_single_pass() {
    let paged = TestReplica::new(2);
    let single = TestReplica::new(5);
    for replica in [&paged, &single] {
        replica.append_all(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")]);
    }

    assert_eq!(paged.sign_all(), vec![2, 2, 1]);
    assert_eq!(single.sign_all(), vec![5]);
    assert!(paged.checkpoint_hash().is_some());
    assert_eq!(paged.checkpoint_hash(), single.checkpoint_hash());
}

#[test]
fn test_validation_page_size_is_independent_of_signing() {
    let replica = TestReplica::new(3);
    replica.append_generated(10, 7);
    replica.sign_all();

    for page_size in [1, 4, 100] {
        let summary = replica
            .orchestrator(page_size, lseal_integration_tests::verifier_keys())
            .validate_all()
            .unwrap();
        assert_eq!(summary.validated, 10, "page size {page_size}");
    }
}

#[test]
fn test_signer_resumes_across_restarts() {
    let replica = TestReplica::new(4);
    replica.append_generated(6, 1);
    assert_eq!(replica.sign_all(), vec![4, 2]);

    // A fresh signer picks up from the stored checkpoint.
    replica.append_generated(3, 2);
    assert_eq!(replica.sign_all(), vec![3]);

    let summary = replica.validator().validate_all().unwrap();
    assert_eq!(summary.validated, 9);
}

#[test]
fn test_unsigned_tail_is_not_tampering() {
    let replica = TestReplica::new(100);
    replica.append_generated(4, 3);
    replica.sign_all();
    let tail = replica.append_generated(2, 4);

    let summary = replica.validator().validate_all().unwrap();
    assert_eq!(summary.validated, 4);
    assert_ne!(summary.last_lseq.as_ref(), tail.last());
}

#[test]
fn test_interleaved_writes_and_signing() {
    let replica = TestReplica::new(2);
    let signer = replica.signer();
    let validator = replica.validator();

    for round in 0..4u32 {
        replica.append_generated(3, round * 10);
        while signer.sign_new().is_ok() {}
        let summary = validator.validate_all().unwrap();
        assert_eq!(summary.validated, 3 * (round as usize + 1));
    }
}
