//! Sign and validate roles for a replica's tamper-evident hash chain.
//!
//! The [`Orchestrator`] ties a [`LogGateway`](lseal_gateway::LogGateway), a
//! [`HashCalculator`](lseal_chain::HashCalculator), and a
//! [`SignatureModule`](lseal_sign::SignatureModule) together:
//!
//! - [`Orchestrator::sign_new`] extends the chain over the next batch of
//!   unsigned entries and writes the signed checkpoints back.
//! - [`Orchestrator::validate_from_lseq`] recomputes the chain over a batch
//!   and compares it with what was stored, one batch per call.
//! - [`Orchestrator::hash_and_sign`] and [`Orchestrator::validate_snapshot`]
//!   attest the whole replica at once with a signed Merkle root.
//!
//! Retry and skip policy is left to the caller; every error carries an
//! [`ErrorClass`] to decide with.

mod error;
mod orchestrator;
mod snapshot;

#[cfg(test)]
mod tests;

pub use error::{ErrorClass, OrchestratorError};
pub use orchestrator::{Orchestrator, SignReport, ValidationProgress, ValidationSummary};
pub use snapshot::SnapshotReport;
