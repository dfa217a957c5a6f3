//! Error types for signing and verification.

/// Errors from the signature module.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The key half needed for the operation was not loaded.
    #[error("no {0} key loaded")]
    MissingKey(&'static str),

    /// The signature does not verify against the digest and key.
    #[error("invalid signature")]
    InvalidSignature,

    /// The payload is not a SHA-256 digest.
    #[error("expected a 32-byte digest, got {0} bytes")]
    DigestLength(usize),

    /// The RSA primitive failed while signing.
    #[error("signing failed: {0}")]
    Signing(String),

    /// PEM text could not be parsed into an RSA key.
    #[error("unable to parse {kind} key: {reason}")]
    KeyParse {
        /// Which half was being parsed.
        kind: &'static str,
        /// Why parsing failed.
        reason: String,
    },
}
