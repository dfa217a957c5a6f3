//! The reserved validation namespace and the stored value format.
//!
//! Validation metadata shares a keyspace with user data. Per-entry records
//! live under [`VALIDATION_PREFIX`] and the reserved slots under
//! [`META_PREFIX`]. Neither prefix is a prefix of the other, so no lseq can
//! name a record that collides with a reserved slot, and the read path
//! filters both out of the user-visible log.
//!
//! Stored values are `hex(hash) ";" hex(signature)` with exactly one `;`.

use crate::Lseq;
use crate::error::TypesError;

/// Prefix of every key in the validation namespace.
pub const VALIDATION_PREFIX: &str = "_v+";

/// Prefix of the reserved slots that are not per-entry records.
pub const META_PREFIX: &str = "_vmeta+";

/// Pointer to the most recently signed source lseq.
pub const LAST_VALIDATED_KEY: &str = "_vmeta+last_validated";

/// Slot for the signed Merkle root of a whole-replica attestation.
pub const SNAPSHOT_KEY: &str = "_vmeta+snapshot";

const DELIMITER: char = ';';

/// Storage key of the checkpoint for `lseq`.
pub fn make_validation_key(lseq: &Lseq) -> String {
    format!("{VALIDATION_PREFIX}{lseq}")
}

/// Whether `key` lies in the validation namespace, reserved slots included.
pub fn is_validation_key(key: &[u8]) -> bool {
    key.starts_with(VALIDATION_PREFIX.as_bytes()) || key.starts_with(META_PREFIX.as_bytes())
}

/// Inverse of [`make_validation_key`].
pub fn lseq_from_validation_key(key: &str) -> Option<Lseq> {
    key.strip_prefix(VALIDATION_PREFIX).map(Lseq::from)
}

/// Join a hash and a signature into one stored string.
pub fn join_hash_and_signature(hash: &str, signature: &str) -> String {
    format!("{hash}{DELIMITER}{signature}")
}

/// Split a stored string back into `(hash, signature)`.
///
/// Requires exactly one delimiter and two non-empty halves.
pub fn split_hash_and_signature(joined: &str) -> Result<(&str, &str), TypesError> {
    let mut parts = joined.split(DELIMITER);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(hash), Some(signature), None) if !hash.is_empty() && !signature.is_empty() => {
            Ok((hash, signature))
        }
        _ => Err(TypesError::MalformedValidationValue(joined.to_string())),
    }
}

/// Encode raw hash and signature bytes into the stored value format.
pub fn encode_validation_value(hash: &[u8], signature: &[u8]) -> String {
    join_hash_and_signature(&hex::encode(hash), &hex::encode(signature))
}

/// Decode a stored value into raw `(hash, signature)` bytes.
pub fn decode_validation_value(value: &str) -> Result<(Vec<u8>, Vec<u8>), TypesError> {
    let (hash, signature) = split_hash_and_signature(value)?;
    Ok((hex::decode(hash)?, hex::decode(signature)?))
}
