//! The incremental chain and the Merkle snapshot must agree on whether the
//! signed entries were altered.

use lseal_integration_tests::TestReplica;
use lseal_orchestrator::ErrorClass;
use proptest::prelude::*;

/// Sign a replica both ways and report (chain ok, snapshot ok).
fn verdicts(replica: &TestReplica) -> (bool, bool) {
    let validator = replica.validator();
    let chain_ok = match validator.validate_all() {
        Ok(_) => true,
        Err(e) if e.class() == ErrorClass::Tampered => false,
        Err(e) => panic!("unexpected chain error: {e}"),
    };
    let snapshot_ok = match validator.validate_snapshot() {
        Ok(_) => true,
        Err(e) if e.class() == ErrorClass::Tampered => false,
        Err(e) => panic!("unexpected snapshot error: {e}"),
    };
    (chain_ok, snapshot_ok)
}

fn signed_replica(entries: usize, page_size: u32) -> (TestReplica, Vec<lseal_types::Lseq>) {
    let replica = TestReplica::new(page_size);
    let lseqs = replica.append_generated(entries, 11);
    replica.sign_all();
    replica.signer().hash_and_sign().unwrap();
    (replica, lseqs)
}

#[test]
fn test_untouched_replica_passes_both() {
    let (replica, _) = signed_replica(6, 4);
    assert_eq!(verdicts(&replica), (true, true));
}

#[test]
fn test_tampered_replica_fails_both() {
    let (replica, lseqs) = signed_replica(6, 4);
    replica.tamper_entry(&lseqs[3], b"rewritten");
    assert_eq!(verdicts(&replica), (false, false));
}

#[test]
fn test_truncated_tail_fails_both() {
    let (replica, lseqs) = signed_replica(6, 4);
    replica.truncate_entry(&lseqs[5]);
    assert_eq!(verdicts(&replica), (false, false));
}

#[test]
fn test_truncated_middle_fails_both() {
    let (replica, lseqs) = signed_replica(6, 4);
    replica.truncate_entry(&lseqs[2]);
    assert_eq!(verdicts(&replica), (false, false));
}

/// What happens to one signed entry before the verdicts are taken.
#[derive(Debug, Clone, Copy)]
enum Alteration {
    None,
    Rewrite,
    Remove,
}

fn alteration() -> impl Strategy<Value = Alteration> {
    prop_oneof![
        Just(Alteration::None),
        Just(Alteration::Rewrite),
        Just(Alteration::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn prop_both_mechanisms_agree(
        entries in 1usize..8,
        page_size in 1u32..5,
        target in any::<prop::sample::Index>(),
        change in alteration(),
    ) {
        let (replica, lseqs) = signed_replica(entries, page_size);
        let target = target.get(&lseqs);
        match change {
            Alteration::None => {}
            Alteration::Rewrite => replica.tamper_entry(target, b"rewritten"),
            Alteration::Remove => replica.truncate_entry(target),
        }

        let (chain_ok, snapshot_ok) = verdicts(&replica);
        prop_assert_eq!(chain_ok, snapshot_ok);
        prop_assert_eq!(chain_ok, matches!(change, Alteration::None));
    }
}
