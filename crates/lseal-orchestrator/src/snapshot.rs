//! One-shot whole-replica attestation over a Merkle tree.
//!
//! Independent of the incremental chain: `hash_and_sign` reads every user
//! entry, signs the tree root, and stores it in the snapshot slot;
//! `validate_snapshot` rebuilds the tree and checks it against that slot.

use lseal_chain::HashCalculator;
use lseal_gateway::LogGateway;
use lseal_merkle::{MerkleError, MerkleTree};
use lseal_types::LogEntry;
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;

type Result<T> = std::result::Result<T, OrchestratorError>;

/// Outcome of a snapshot attestation or check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Number of user entries covered by the tree.
    pub entries: usize,
    /// The Merkle root.
    pub root: [u8; 32],
}

impl<G: LogGateway, C: HashCalculator> Orchestrator<G, C> {
    /// Every user entry in the replica, in log order.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        let mut all: Vec<LogEntry> = Vec::new();
        loop {
            let cursor = all.last().map(|e| e.lseq.clone());
            let page = self.gateway.read_batch(cursor.as_ref())?;
            if page.is_empty() {
                break;
            }
            debug!(count = page.len(), "read page for snapshot");
            all.extend(page);
        }
        Ok(all)
    }

    /// Sign the Merkle root over the whole replica and store it.
    pub fn hash_and_sign(&self) -> Result<SnapshotReport> {
        let tree = MerkleTree::build(self.read_all()?)?;
        let checkpoint = tree.sign_root(&self.signer)?;
        self.gateway.put_snapshot(&checkpoint)?;

        info!(entries = tree.len(), "stored snapshot attestation");
        Ok(SnapshotReport {
            entries: tree.len(),
            root: *tree.root_digest(),
        })
    }

    /// Rebuild the Merkle tree and check it against the stored attestation.
    ///
    /// Fails with [`OrchestratorError::SnapshotMismatch`] when the entry set
    /// changed since it was attested.
    pub fn validate_snapshot(&self) -> Result<SnapshotReport> {
        let checkpoint = self
            .gateway
            .get_snapshot()?
            .ok_or(OrchestratorError::SnapshotMissing)?;
        let entries = self.read_all()?;
        if entries.is_empty() {
            warn!("snapshot exists but the log has no entries");
            return Err(OrchestratorError::SnapshotMismatch);
        }
        let tree = MerkleTree::build(entries)?;

        match tree.verify_root_digest(&checkpoint.digest) {
            Ok(()) => {}
            Err(MerkleError::InvalidDigest) => {
                warn!(entries = tree.len(), "snapshot root does not match log");
                return Err(OrchestratorError::SnapshotMismatch);
            }
            Err(e) => return Err(e.into()),
        }
        tree.verify_root_signature(&checkpoint.signature, &self.signer)?;

        info!(entries = tree.len(), "snapshot attestation verified");
        Ok(SnapshotReport {
            entries: tree.len(),
            root: *tree.root_digest(),
        })
    }
}
