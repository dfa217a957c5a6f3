
use std::sync::Arc;

use lseal_chain::{ChainMode, HashCalculator, Sha256Chain};
use lseal_gateway::{LogStore, LseqGateway, MemoryLogStore};
use lseal_sign::SignatureModule;
use lseal_sign::keys::{parse_private_key_pem, parse_public_key_pem};
use lseal_types::{LogEntry, ValidationRecord};

use crate::orchestrator::Orchestrator;

const SIGNER_PEM: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata/signer.pem"));
const SIGNER_PUB_PEM: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata/signer.pub.pem"));
const OTHER_PEM: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../testdata/other.pem"));

type TestGateway = LseqGateway<Arc<MemoryLogStore>>;
type TestOrchestrator = Orchestrator<TestGateway, Sha256Chain>;

fn signer() -> SignatureModule {
    SignatureModule::from_private_key(parse_private_key_pem(SIGNER_PEM).unwrap())
}

fn verifier() -> SignatureModule {
    SignatureModule::verify_only(parse_public_key_pem(SIGNER_PUB_PEM).unwrap())
}

fn stranger() -> SignatureModule {
    SignatureModule::from_private_key(parse_private_key_pem(OTHER_PEM).unwrap())
}

fn gateway(store: &Arc<MemoryLogStore>, page_size: u32) -> TestGateway {
    LseqGateway::new(store.clone(), store.replica_id()).with_page_size(page_size)
}

/// A signing orchestrator over a fresh in-memory replica.
fn setup(page_size: u32) -> (TestOrchestrator, Arc<MemoryLogStore>) {
    let store = Arc::new(MemoryLogStore::new(1));
    let orchestrator = Orchestrator::new(
        gateway(&store, page_size),
        Sha256Chain::new(ChainMode::Full),
        signer(),
    );
    (orchestrator, store)
}

/// Another orchestrator over the same replica with a different key set.
fn with_keys(store: &Arc<MemoryLogStore>, keys: SignatureModule) -> TestOrchestrator {
    Orchestrator::new(gateway(store, 100), Sha256Chain::new(ChainMode::Full), keys)
}

/// Append user entries; lseqs follow the store's counter.
fn append(store: &MemoryLogStore, kvs: &[(&str, &str)]) {
    for (key, value) in kvs {
        store.put(key.as_bytes(), value.as_bytes()).unwrap();
    }
}

/// The three entries from the basic sign-and-validate scenario.
fn abc(store: &MemoryLogStore) {
    append(store, &[("a", "x"), ("b", "y"), ("c", "z")]);
}

/// User entries as the gateway would return them.
fn user_entries(store: &MemoryLogStore) -> Vec<LogEntry> {
    store
        .items()
        .into_iter()
        .filter(|item| !lseal_types::is_validation_key(&item.key))
        .map(|item| LogEntry {
            lseq: item.lseq,
            key: item.key,
            value: item.value,
        })
        .collect()
}

/// Chain value over all user entries in one pass.
fn expected_head(store: &MemoryLogStore) -> Vec<u8> {
    let records = Sha256Chain::new(ChainMode::Full).calculate_batch(&user_entries(store), None);
    records.last().map(|r| r.hash.clone()).unwrap_or_default()
}

/// Calculator that loses the last record of every batch.
struct ShortCalculator;

impl HashCalculator for ShortCalculator {
    fn calculate_batch(&self, entries: &[LogEntry], seed: Option<&[u8]>) -> Vec<ValidationRecord> {
        let mut records = Sha256Chain::default().calculate_batch(entries, seed);
        records.pop();
        records
    }
}
