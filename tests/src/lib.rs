//! Shared test harness for lseal integration tests.
//!
//! Provides [`TestReplica`]: an in-memory replica plus the helpers to sign
//! it, validate it, and tamper with it behind the gateway's back.

use std::sync::Arc;

use lseal_chain::{ChainMode, Sha256Chain};
use lseal_gateway::{LogGateway, LogStore, LseqGateway, MemoryLogStore};
use lseal_orchestrator::Orchestrator;
use lseal_sign::SignatureModule;
use lseal_sign::keys::{parse_private_key_pem, parse_public_key_pem};
use lseal_types::{Lseq, decode_validation_value, encode_validation_value, make_validation_key};

const SIGNER_PEM: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../testdata/signer.pem"));
const SIGNER_PUB_PEM: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../testdata/signer.pub.pem"));

/// Orchestrator over a [`TestReplica`].
pub type ReplicaOrchestrator = Orchestrator<LseqGateway<Arc<MemoryLogStore>>, Sha256Chain>;

/// Keys of the sign role.
pub fn signer_keys() -> SignatureModule {
    SignatureModule::from_private_key(parse_private_key_pem(SIGNER_PEM).expect("signer key"))
}

/// Public half only, as a validate-role process would hold it.
pub fn verifier_keys() -> SignatureModule {
    SignatureModule::verify_only(parse_public_key_pem(SIGNER_PUB_PEM).expect("public key"))
}

/// A single in-memory replica.
pub struct TestReplica {
    store: Arc<MemoryLogStore>,
    page_size: u32,
}

impl TestReplica {
    /// Empty replica read `page_size` user entries at a time.
    pub fn new(page_size: u32) -> Self {
        Self {
            store: Arc::new(MemoryLogStore::new(1)),
            page_size,
        }
    }

    /// The raw store.
    pub fn store(&self) -> &MemoryLogStore {
        &self.store
    }

    /// Append one user entry.
    pub fn append(&self, key: &str, value: &str) -> Lseq {
        self.store
            .put(key.as_bytes(), value.as_bytes())
            .expect("append")
    }

    /// Append user entries in order.
    pub fn append_all(&self, kvs: &[(&str, &str)]) -> Vec<Lseq> {
        kvs.iter().map(|(k, v)| self.append(k, v)).collect()
    }

    /// Append `n` generated user entries.
    pub fn append_generated(&self, n: usize, seed: u32) -> Vec<Lseq> {
        (0..n)
            .map(|i| {
                let value = test_value(16, seed.wrapping_add(i as u32));
                self.append(&format!("key-{seed}-{i}"), &value)
            })
            .collect()
    }

    /// Orchestrator holding the private key.
    pub fn signer(&self) -> ReplicaOrchestrator {
        self.orchestrator(self.page_size, signer_keys())
    }

    /// Orchestrator holding only the public key.
    pub fn validator(&self) -> ReplicaOrchestrator {
        self.orchestrator(self.page_size, verifier_keys())
    }

    /// Orchestrator with an explicit page size and key set.
    pub fn orchestrator(&self, page_size: u32, keys: SignatureModule) -> ReplicaOrchestrator {
        let gateway = LseqGateway::new(self.store.clone(), self.store.replica_id())
            .with_page_size(page_size);
        Orchestrator::new(gateway, Sha256Chain::new(ChainMode::Full), keys)
    }

    /// Sign until the log is caught up, returning the batch sizes.
    pub fn sign_all(&self) -> Vec<usize> {
        let signer = self.signer();
        std::iter::from_fn(|| signer.sign_new().ok())
            .map(|report| report.signed)
            .collect()
    }

    /// The stored checkpoint hash, if anything was signed.
    pub fn checkpoint_hash(&self) -> Option<Vec<u8>> {
        self.validator()
            .gateway()
            .get_last_validated()
            .expect("checkpoint")
            .map(|record| record.hash)
    }

    /// Rewrite a user entry's value in place.
    pub fn tamper_entry(&self, lseq: &Lseq, value: &[u8]) {
        self.store
            .overwrite_in_place(lseq, value)
            .expect("tamper entry");
    }

    /// Cut a user entry out of the log, leaving its record and the
    /// checkpoint in place.
    pub fn truncate_entry(&self, lseq: &Lseq) {
        self.store.remove_in_place(lseq).expect("remove entry");
    }

    /// Replace the stored record for `lseq` with a validly signed record
    /// over the wrong hash.
    pub fn forge_record(&self, lseq: &Lseq) {
        let key = make_validation_key(lseq);
        let stored = self
            .store
            .get_value(self.store.replica_id(), key.as_bytes())
            .expect("read record")
            .expect("record exists");
        let text = std::str::from_utf8(&stored.value).expect("utf-8 record");
        let (mut hash, _) = decode_validation_value(text).expect("well-formed record");
        hash[0] ^= 0xff;
        let signature = signer_keys().sign(&hash).expect("sign forged hash");
        self.store
            .put(key.as_bytes(), encode_validation_value(&hash, &signature).as_bytes())
            .expect("write forged record");
    }
}

/// Deterministic printable value for generated entries.
pub fn test_value(len: usize, seed: u32) -> String {
    let mut state: u32 = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            char::from(b'a' + ((state >> 16) % 26) as u8)
        })
        .collect()
}
