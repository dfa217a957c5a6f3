//! Error types for the sign and validate roles.

use lseal_gateway::GatewayError;
use lseal_merkle::MerkleError;
use lseal_sign::SignatureError;
use lseal_types::Lseq;

/// How a caller should react to an [`OrchestratorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Backend or transport failure. The caller may retry.
    Transient,
    /// Nothing left to do. Not a failure.
    Exhausted,
    /// Stored history does not match the log. Never retried.
    Tampered,
    /// Validation metadata is inconsistent. Fatal even when skipping errors.
    Corruption,
    /// The caller passed an inconsistent request.
    BadInput,
    /// A key is missing or a signature does not verify.
    Crypto,
}

/// Errors returned by [`crate::Orchestrator`].
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The log has no entries past the cursor, or none of them are signed.
    #[error("no new entities")]
    NoNewEntities,

    /// A stored chain hash differs from the recomputed one.
    #[error("validation failed at lseq {lseq}")]
    ValidationFailed {
        /// The first entry whose hash does not match.
        lseq: Lseq,
    },

    /// The stored checkpoint names a signed entry the walk never reached,
    /// so signed entries were cut from the log.
    #[error("signed entry {checkpoint} is missing from the log")]
    Truncated {
        /// Lseq the checkpoint pointer names.
        checkpoint: Lseq,
    },

    /// Two sequences that must line up do not.
    #[error("batch length mismatch: expected at most {expected}, got {actual}")]
    BatchLengthMismatch {
        /// Length of the reference sequence.
        expected: usize,
        /// Length actually produced or read.
        actual: usize,
    },

    /// Cursor and seed hash must be given together.
    #[error("bad input: {0}")]
    BadInput(String),

    /// The stored checkpoint does not name a source entry.
    #[error("checkpoint {0} does not name a log entry")]
    DetachedCheckpoint(String),

    /// Snapshot validation was asked for but none was ever stored.
    #[error("no snapshot attestation stored")]
    SnapshotMissing,

    /// The rebuilt Merkle root differs from the attested one.
    #[error("snapshot root does not match the log")]
    SnapshotMismatch,

    /// Signing or verifying a chain checkpoint failed.
    #[error("signature error at lseq {lseq}: {source}")]
    Signature {
        /// Entry whose checkpoint was being signed or verified.
        lseq: Lseq,
        /// Underlying failure.
        source: SignatureError,
    },

    /// A gateway call failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Building or checking the Merkle tree failed.
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),
}

impl OrchestratorError {
    /// Classify this error for the driver loop.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoNewEntities => ErrorClass::Exhausted,
            Self::ValidationFailed { .. } | Self::Truncated { .. } | Self::SnapshotMismatch => {
                ErrorClass::Tampered
            }
            Self::BatchLengthMismatch { .. } | Self::DetachedCheckpoint(_) => {
                ErrorClass::Corruption
            }
            Self::BadInput(_) | Self::SnapshotMissing => ErrorClass::BadInput,
            Self::Signature { .. } => ErrorClass::Crypto,
            Self::Gateway(e) if e.is_corruption() => ErrorClass::Corruption,
            Self::Gateway(_) => ErrorClass::Transient,
            Self::Merkle(MerkleError::EmptyInput) => ErrorClass::Exhausted,
            Self::Merkle(MerkleError::InvalidDigest) => ErrorClass::Tampered,
            Self::Merkle(MerkleError::Signature(_)) => ErrorClass::Crypto,
            Self::Merkle(_) => ErrorClass::Corruption,
        }
    }

    /// Whether this is the "nothing left to do" signal.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::NoNewEntities)
    }
}
