//! Signing and validating a replica persisted as a JSON-lines file.

use lseal_chain::{ChainMode, Sha256Chain};
use lseal_gateway::{JsonlLogStore, LogGateway, LogStore, LseqGateway};
use lseal_integration_tests::{signer_keys, verifier_keys};
use lseal_orchestrator::{Orchestrator, OrchestratorError};
use lseal_sign::SignatureModule;
use lseal_types::Lseq;

fn open(
    path: &std::path::Path,
    keys: SignatureModule,
) -> Orchestrator<LseqGateway<JsonlLogStore>, Sha256Chain> {
    let store = JsonlLogStore::open(path, 9).unwrap();
    Orchestrator::new(
        LseqGateway::new(store, 9).with_page_size(2),
        Sha256Chain::new(ChainMode::Compact),
        keys,
    )
}

#[test]
fn test_sign_and_validate_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replica.jsonl");

    {
        let signer = open(&path, signer_keys());
        for (k, v) in [("a", "x"), ("b", "y"), ("c", "z")] {
            signer.gateway().store().put(k.as_bytes(), v.as_bytes()).unwrap();
        }
        while signer.sign_new().is_ok() {}
        signer.hash_and_sign().unwrap();
        signer.gateway().close().unwrap();
    }

    let validator = open(&path, verifier_keys());
    let summary = validator.validate_all().unwrap();
    assert_eq!(summary.validated, 3);
    assert_eq!(summary.last_lseq, Some(Lseq::from("3")));
    assert_eq!(validator.validate_snapshot().unwrap().entries, 3);
}

#[test]
fn test_edited_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replica.jsonl");

    {
        let signer = open(&path, signer_keys());
        for (k, v) in [("a", "x"), ("b", "y"), ("c", "z")] {
            signer.gateway().store().put(k.as_bytes(), v.as_bytes()).unwrap();
        }
        while signer.sign_new().is_ok() {}
        signer.gateway().close().unwrap();
    }

    // Rewrite the value of "b" ("79" is hex for 'y') directly in the file.
    let contents = std::fs::read_to_string(&path).unwrap();
    let edited = contents.replacen(
        r#"{"lseq":"2","key":"62","value":"79"}"#,
        r#"{"lseq":"2","key":"62","value":"59"}"#,
        1,
    );
    assert_ne!(contents, edited);
    std::fs::write(&path, edited).unwrap();

    let validator = open(&path, verifier_keys());
    assert!(matches!(
        validator.validate_all(),
        Err(OrchestratorError::ValidationFailed { lseq }) if lseq.as_str() == "2"
    ));
}
