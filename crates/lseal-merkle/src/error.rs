//! Error types for the Merkle tree.

/// Errors that can occur while building or checking a Merkle tree.
#[derive(Debug, thiserror::Error)]
pub enum MerkleError {
    /// A tree cannot be built over zero entries.
    #[error("cannot build a merkle tree over an empty entry set")]
    EmptyInput,

    /// A claimed root does not match the rebuilt tree.
    #[error("invalid merkle tree hash")]
    InvalidDigest,

    /// A content comparison touched a node that carries no entry.
    #[error("value is not a leaf entry")]
    WrongContentType,

    /// Signing or verifying the root failed.
    #[error("signature error: {0}")]
    Signature(#[from] lseal_sign::SignatureError),

    /// Canonical serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<postcard::Error> for MerkleError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
