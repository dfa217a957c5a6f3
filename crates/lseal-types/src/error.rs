//! Error types for the shared data model.

/// Errors raised while parsing stored validation metadata.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// A stored value is not exactly `hash;signature`.
    #[error("malformed validation value, expected 'hash;signature': {0:?}")]
    MalformedValidationValue(String),

    /// One half of a stored value is not valid hex.
    #[error("invalid hex in validation value: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
