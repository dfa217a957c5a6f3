//! Error types for gateway and log store operations.

use lseal_types::{Lseq, TypesError};

/// Errors that can occur while reading from or writing to a replica.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The log store backend failed (unreachable, rejected the call, ...).
    #[error("log store error: {0}")]
    Store(String),

    /// An I/O error occurred in a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store answered for a different replica than the one asked for.
    #[error("requested replica {requested}, store returned replica {returned}")]
    WrongReplica {
        /// Replica id in the request.
        requested: u32,
        /// Replica id in the response.
        returned: u32,
    },

    /// A read cursor names an lseq the replica does not contain.
    #[error("unknown lseq: {0}")]
    UnknownLseq(Lseq),

    /// Two writes claim the same position.
    #[error("duplicate lseq: {0}")]
    DuplicateLseq(Lseq),

    /// The checkpoint pointer names a record that is not in the store.
    #[error("last validated lseq {0} has no validation record")]
    LastValidatedMissing(Lseq),

    /// A stored validation value is not `hex(hash);hex(signature)`.
    #[error("malformed validation record under {key}: {source}")]
    Malformed {
        /// Key the value was read from.
        key: String,
        /// What was wrong with it.
        source: TypesError,
    },

    /// A stored validation value is not UTF-8.
    #[error("validation value under {0} is not valid utf-8")]
    NonUtf8Value(String),
}

impl GatewayError {
    /// Whether this error means the replica or its validation metadata is
    /// inconsistent, as opposed to a transport or backend failure. Retrying
    /// never clears these.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            GatewayError::LastValidatedMissing(_)
                | GatewayError::UnknownLseq(_)
                | GatewayError::Malformed { .. }
                | GatewayError::NonUtf8Value(_)
                | GatewayError::DuplicateLseq(_)
        )
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
