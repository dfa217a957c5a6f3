//! Shared types for lseal.
//!
//! This crate defines the data model every other lseal crate speaks:
//! positions in a replica's log ([`Lseq`]), raw entries read from the log
//! ([`LogEntry`]), the per-entry chain checkpoints the sign role writes back
//! ([`ValidationRecord`], [`SignedRecord`]), and the whole-replica attestation
//! ([`SignedCheckpoint`]).
//!
//! The [`namespace`] module owns the reserved key prefixes under which all of
//! this metadata lives, interleaved with user data in the same keyspace, and
//! the `hash;signature` wire format of stored values.

use std::fmt;

use serde::{Deserialize, Serialize};

mod error;
pub mod namespace;

pub use error::TypesError;
pub use namespace::{
    LAST_VALIDATED_KEY, META_PREFIX, SNAPSHOT_KEY, VALIDATION_PREFIX, decode_validation_value,
    encode_validation_value, is_validation_key, join_hash_and_signature,
    lseq_from_validation_key, make_validation_key, split_hash_and_signature,
};

// ---------------------------------------------------------------------------
// Lseq
// ---------------------------------------------------------------------------

/// Position of an entry in a replica's log.
///
/// Lseqs are assigned by the log store and are monotonic per replica, but
/// their encoding is opaque: order is whatever the store returns, never a
/// lexical comparison of the strings. The empty string is a legal lseq.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lseq(String);

impl Lseq {
    /// Wrap a store-assigned sequence id.
    pub fn new(lseq: impl Into<String>) -> Self {
        Self(lseq.into())
    }

    /// Borrow the raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the raw string form.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for Lseq {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lseq {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Lseq {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Lseq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Lseq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lseq({:?})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// A single user write, as read back from a replica.
///
/// Entries are immutable snapshots: the orchestrator only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the replica's log.
    pub lseq: Lseq,
    /// User key.
    pub key: Vec<u8>,
    /// User value.
    pub value: Vec<u8>,
}

impl LogEntry {
    /// Build an entry from anything byte-like.
    pub fn new(lseq: impl Into<Lseq>, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Self {
            lseq: lseq.into(),
            key: key.as_ref().to_vec(),
            value: value.as_ref().to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation records
// ---------------------------------------------------------------------------

/// The chain checkpoint for one source entry.
///
/// `lseq` is attached in full-chain mode and left out in compact mode, or
/// when the record was reconstructed from its validation key alone. Use
/// [`ValidationRecord::source_lseq`] to get the position regardless of shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// The source entry's position, when carried explicitly.
    pub lseq: Option<Lseq>,
    /// Storage key: `VALIDATION_PREFIX + lseq`.
    pub validation_key: String,
    /// Chain value as of (and including) the source entry.
    pub hash: Vec<u8>,
}

impl ValidationRecord {
    /// Build a record for `lseq`, optionally carrying the lseq itself.
    pub fn new(lseq: &Lseq, hash: Vec<u8>, attach_lseq: bool) -> Self {
        Self {
            lseq: attach_lseq.then(|| lseq.clone()),
            validation_key: make_validation_key(lseq),
            hash,
        }
    }

    /// Reconstruct a record from a stored validation key and hash.
    ///
    /// The lseq field is left empty: the key is the only source of truth.
    pub fn from_key(validation_key: impl Into<String>, hash: Vec<u8>) -> Self {
        Self {
            lseq: None,
            validation_key: validation_key.into(),
            hash,
        }
    }

    /// Position of the source entry.
    ///
    /// Falls back to stripping the namespace prefix off the validation key
    /// when the lseq was not carried. Returns `None` only for a key outside
    /// the namespace.
    pub fn source_lseq(&self) -> Option<Lseq> {
        match &self.lseq {
            Some(lseq) => Some(lseq.clone()),
            None => lseq_from_validation_key(&self.validation_key),
        }
    }
}

/// A validation record together with the signature over its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRecord {
    /// The checkpoint being attested.
    pub record: ValidationRecord,
    /// Signature over `record.hash`.
    pub signature: Vec<u8>,
}

impl SignedRecord {
    /// Render the stored value (`hex(hash);hex(signature)`).
    pub fn encode_value(&self) -> String {
        encode_validation_value(&self.record.hash, &self.signature)
    }
}

/// A digest plus its signature: a chain value or a Merkle root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCheckpoint {
    /// The attested digest.
    pub digest: Vec<u8>,
    /// Signature over `digest`.
    pub signature: Vec<u8>,
}

impl SignedCheckpoint {
    /// Render in the same wire format as validation records.
    pub fn encode_value(&self) -> String {
        encode_validation_value(&self.digest, &self.signature)
    }

    /// Parse a stored `hex(digest);hex(signature)` value.
    pub fn decode_value(value: &str) -> Result<Self, TypesError> {
        let (digest, signature) = decode_validation_value(value)?;
        Ok(Self { digest, signature })
    }
}
