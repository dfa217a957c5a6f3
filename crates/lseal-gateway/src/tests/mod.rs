
use std::sync::Arc;

use lseal_types::{Lseq, SignedRecord, ValidationRecord};

use crate::gateway::LseqGateway;
use crate::memory_store::MemoryLogStore;

/// A gateway over a shared in-memory store, with a handle to the store.
fn test_gateway(page_size: u32) -> (LseqGateway<Arc<MemoryLogStore>>, Arc<MemoryLogStore>) {
    let store = Arc::new(MemoryLogStore::new(1));
    let gateway = LseqGateway::new(store.clone(), 1).with_page_size(page_size);
    (gateway, store)
}

/// A signed record for `lseq` with recognizable filler bytes.
fn signed(lseq: &str, fill: u8) -> SignedRecord {
    SignedRecord {
        record: ValidationRecord::new(&Lseq::from(lseq), vec![fill; 32], true),
        signature: vec![fill ^ 0xff; 16],
    }
}
