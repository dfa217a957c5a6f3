//! PEM parsing for RSA key material.
//!
//! Private keys are accepted as PKCS#1 (`BEGIN RSA PRIVATE KEY`) or PKCS#8
//! (`BEGIN PRIVATE KEY`); public keys as SubjectPublicKeyInfo
//! (`BEGIN PUBLIC KEY`) or PKCS#1 (`BEGIN RSA PUBLIC KEY`).

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::SignatureError;

/// Parse an RSA private key from PEM text.
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, SignatureError> {
    let pem = pem.trim();
    if pem.is_empty() {
        return Err(SignatureError::KeyParse {
            kind: "private",
            reason: "no PEM block found".into(),
        });
    }
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| SignatureError::KeyParse {
            kind: "private",
            reason: e.to_string(),
        })
}

/// Parse an RSA public key from PEM text.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, SignatureError> {
    let pem = pem.trim();
    if pem.is_empty() {
        return Err(SignatureError::KeyParse {
            kind: "public",
            reason: "no PEM block found".into(),
        });
    }
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| SignatureError::KeyParse {
            kind: "public",
            reason: e.to_string(),
        })
}
