//! Asymmetric signatures over chain digests and Merkle roots.
//!
//! Signatures are RSA-PSS with SHA-256 and a random salt, so signing the same
//! digest twice yields different signatures that both verify. Payloads are
//! already SHA-256 digests and go into the PSS encoding as the message hash,
//! without being hashed again. The module knows nothing about logs.
//!
//! Key material arrives already loaded. [`keys`] parses PEM text into key
//! objects; reading the files is the caller's business.

mod error;
pub mod keys;

use rand::rngs::OsRng;
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::SignatureEncoding;
use rsa::signature::hazmat::{PrehashVerifier, RandomizedPrehashSigner};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use tracing::trace;

pub use error::SignatureError;
pub use rsa;

type Result<T> = std::result::Result<T, SignatureError>;

/// Length of a SHA-256 digest, the only payload size accepted.
pub const DIGEST_LEN: usize = 32;

/// Sign the SHA-256 `digest` with `private_key`.
///
/// Fails with [`SignatureError::MissingKey`] when no key is supplied and with
/// [`SignatureError::DigestLength`] when `digest` is not [`DIGEST_LEN`] bytes.
pub fn sign(digest: &[u8], private_key: Option<&RsaPrivateKey>) -> Result<Vec<u8>> {
    let key = private_key.ok_or(SignatureError::MissingKey("private"))?;
    if digest.len() != DIGEST_LEN {
        return Err(SignatureError::DigestLength(digest.len()));
    }
    let signing_key = BlindedSigningKey::<Sha256>::new(key.clone());
    let signature = signing_key
        .sign_prehash_with_rng(&mut OsRng, digest)
        .map_err(|e| SignatureError::Signing(e.to_string()))?;
    trace!(digest_len = digest.len(), "signed digest");
    Ok(signature.to_vec())
}

/// Verify `signature` over `digest` with `public_key`.
///
/// Fails with [`SignatureError::MissingKey`] when no key is supplied and with
/// [`SignatureError::InvalidSignature`] for any signature that does not check
/// out, including ones that cannot be parsed and digests of the wrong size.
pub fn verify(signature: &[u8], digest: &[u8], public_key: Option<&RsaPublicKey>) -> Result<()> {
    let key = public_key.ok_or(SignatureError::MissingKey("public"))?;
    let verifying_key = VerifyingKey::<Sha256>::new(key.clone());
    let signature =
        Signature::try_from(signature).map_err(|_| SignatureError::InvalidSignature)?;
    verifying_key
        .verify_prehash(digest, &signature)
        .map_err(|_| SignatureError::InvalidSignature)
}

/// The loaded key material of one operator.
///
/// A sign-role process holds the private key (and usually the public one);
/// a validate-role process only needs the public key.
#[derive(Debug, Clone, Default)]
pub struct SignatureModule {
    private_key: Option<RsaPrivateKey>,
    public_key: Option<RsaPublicKey>,
}

impl SignatureModule {
    /// Build from optional key halves.
    pub fn new(private_key: Option<RsaPrivateKey>, public_key: Option<RsaPublicKey>) -> Self {
        Self {
            private_key,
            public_key,
        }
    }

    /// Both halves from a private key.
    pub fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        Self::new(Some(private_key), Some(public_key))
    }

    /// Verify-only module.
    pub fn verify_only(public_key: RsaPublicKey) -> Self {
        Self::new(None, Some(public_key))
    }

    /// Whether this module can sign.
    pub fn can_sign(&self) -> bool {
        self.private_key.is_some()
    }

    /// Whether this module can verify.
    pub fn can_verify(&self) -> bool {
        self.public_key.is_some()
    }

    /// Sign `digest` with the loaded private key.
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>> {
        sign(digest, self.private_key.as_ref())
    }

    /// Verify `signature` over `digest` with the loaded public key.
    pub fn verify(&self, signature: &[u8], digest: &[u8]) -> Result<()> {
        verify(signature, digest, self.public_key.as_ref())
    }
}
