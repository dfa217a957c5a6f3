//! Binary Merkle tree over a replica's entries.
//!
//! Where the hash chain is a single running value that is cheap to extend,
//! the tree summarizes a whole (or bounded) entry set in one root that can be
//! signed once, and it can point at the exact entry that differs between two
//! builds.
//!
//! Layout:
//! - leaf hash: `SHA256(canonical(entry))`, where `canonical` is the postcard
//!   encoding of `(lseq, key, value)`;
//! - internal node: `SHA256(left || right)`;
//! - an odd node at any level is paired with a copy of itself, so a
//!   single-entry tree still has one internal level above its leaf.

mod error;

use lseal_sign::SignatureModule;
use lseal_types::{LogEntry, SignedCheckpoint};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

pub use error::MerkleError;

type Result<T> = std::result::Result<T, MerkleError>;

/// Serialized form hashed into a leaf.
#[derive(Serialize)]
struct CanonicalEntry<'a> {
    lseq: &'a str,
    key: &'a [u8],
    value: &'a [u8],
}

/// Canonical byte encoding of an entry.
pub fn canonical_bytes(entry: &LogEntry) -> Result<Vec<u8>> {
    let canonical = CanonicalEntry {
        lseq: entry.lseq.as_str(),
        key: &entry.key,
        value: &entry.value,
    };
    Ok(postcard::to_allocvec(&canonical)?)
}

/// A leaf: one entry and its content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    entry: LogEntry,
    content: Vec<u8>,
    hash: [u8; 32],
}

impl Leaf {
    fn new(entry: LogEntry) -> Result<Self> {
        let content = canonical_bytes(&entry)?;
        let hash = Sha256::digest(&content).into();
        Ok(Self {
            entry,
            content,
            hash,
        })
    }

    /// The entry this leaf commits to.
    pub fn entry(&self) -> &LogEntry {
        &self.entry
    }

    /// Content hash of the entry.
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }
}

/// A node of the tree as seen by comparisons.
#[derive(Debug, Clone, Copy)]
pub enum MerkleNode<'a> {
    /// A leaf, carrying its entry.
    Leaf(&'a Leaf),
    /// An internal node; only its hash is known.
    Internal(&'a [u8; 32]),
}

impl MerkleNode<'_> {
    /// Hash of this node.
    pub fn hash(&self) -> &[u8; 32] {
        match self {
            MerkleNode::Leaf(leaf) => &leaf.hash,
            MerkleNode::Internal(hash) => hash,
        }
    }

    /// Byte-exact equality of two leaves' canonical content.
    ///
    /// Only leaves carry content: comparing against an internal node fails
    /// with [`MerkleError::WrongContentType`].
    pub fn equals(&self, other: &MerkleNode<'_>) -> Result<bool> {
        match (self, other) {
            (MerkleNode::Leaf(a), MerkleNode::Leaf(b)) => Ok(a.content == b.content),
            _ => Err(MerkleError::WrongContentType),
        }
    }
}

/// Merkle tree built over an ordered entry set.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    leaves: Vec<Leaf>,
    /// `levels[0]` holds the leaf hashes, the last level holds only the root.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree over `entries`, in order.
    pub fn build(entries: impl IntoIterator<Item = LogEntry>) -> Result<Self> {
        let leaves = entries
            .into_iter()
            .map(Leaf::new)
            .collect::<Result<Vec<_>>>()?;
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut levels = vec![leaves.iter().map(|l| l.hash).collect::<Vec<_>>()];
        while levels.len() == 1 || levels[levels.len() - 1].len() > 1 {
            let next = pair_up(&levels[levels.len() - 1]);
            levels.push(next);
        }

        debug!(leaves = leaves.len(), depth = levels.len(), "built merkle tree");
        Ok(Self { leaves, levels })
    }

    /// Number of entries committed to.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Always false: a tree cannot be built over nothing.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// The root digest.
    pub fn root_digest(&self) -> &[u8; 32] {
        &self.levels[self.levels.len() - 1][0]
    }

    /// Leaf at `index`.
    pub fn leaf(&self, index: usize) -> Option<&Leaf> {
        self.leaves.get(index)
    }

    /// Node at `(level, index)`; level 0 is the leaf level.
    pub fn node(&self, level: usize, index: usize) -> Option<MerkleNode<'_>> {
        if level == 0 {
            return self.leaves.get(index).map(MerkleNode::Leaf);
        }
        self.levels
            .get(level)
            .and_then(|hashes| hashes.get(index))
            .map(MerkleNode::Internal)
    }

    /// The root as a node.
    pub fn root(&self) -> MerkleNode<'_> {
        MerkleNode::Internal(self.root_digest())
    }

    /// Sign the root digest.
    pub fn sign_root(&self, signer: &SignatureModule) -> Result<SignedCheckpoint> {
        let signature = signer.sign(self.root_digest())?;
        Ok(SignedCheckpoint {
            digest: self.root_digest().to_vec(),
            signature,
        })
    }

    /// Check a claimed root against this tree's root, byte for byte.
    pub fn verify_root_digest(&self, claimed: &[u8]) -> Result<()> {
        if claimed == self.root_digest() {
            Ok(())
        } else {
            Err(MerkleError::InvalidDigest)
        }
    }

    /// Check a signature over this tree's root.
    pub fn verify_root_signature(
        &self,
        signature: &[u8],
        verifier: &SignatureModule,
    ) -> Result<()> {
        verifier.verify(signature, self.root_digest())?;
        Ok(())
    }

    /// Check a signed checkpoint: digest first, then signature.
    pub fn verify_checkpoint(
        &self,
        checkpoint: &SignedCheckpoint,
        verifier: &SignatureModule,
    ) -> Result<()> {
        self.verify_root_digest(&checkpoint.digest)?;
        self.verify_root_signature(&checkpoint.signature, verifier)
    }

    /// Whether `entry` is committed to by this tree.
    ///
    /// Locates the leaf with identical content and re-derives the root along
    /// its authentication path.
    pub fn verify_content(&self, entry: &LogEntry) -> Result<bool> {
        let candidate = Leaf::new(entry.clone())?;
        let Some(index) = self.leaves.iter().position(|l| l.content == candidate.content) else {
            return Ok(false);
        };

        let mut hash = candidate.hash;
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if position % 2 == 0 {
                level.get(position + 1).unwrap_or(&level[position])
            } else {
                &level[position - 1]
            };
            hash = if position % 2 == 0 {
                hash_pair(&hash, sibling)
            } else {
                hash_pair(sibling, &hash)
            };
            position /= 2;
        }

        Ok(&hash == self.root_digest())
    }

    /// First leaf index at which `self` and `other` commit to different
    /// entries, or `None` if they commit to the same sequence.
    ///
    /// When one tree is a strict prefix of the other, the first index past
    /// the shorter one is reported.
    pub fn first_divergent_leaf(&self, other: &MerkleTree) -> Option<usize> {
        if self.root_digest() == other.root_digest() && self.len() == other.len() {
            return None;
        }
        let common = self.len().min(other.len());
        (0..common)
            .find(|&i| self.leaves[i].hash != other.leaves[i].hash)
            .or((self.len() != other.len()).then_some(common))
    }
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    Sha256::new()
        .chain_update(left)
        .chain_update(right)
        .finalize()
        .into()
}

/// Hash one level into the next, pairing an odd last node with itself.
fn pair_up(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [single] => hash_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}
