//! Loading RSA key files for the sign and validate roles.

use std::path::Path;

use anyhow::{Context, Result};
use lseal_sign::SignatureModule;
use lseal_sign::keys::{parse_private_key_pem, parse_public_key_pem};
use lseal_sign::rsa::RsaPrivateKey;
use tracing::debug;

/// Build a [`SignatureModule`] from whichever key files are configured.
///
/// Without an explicit public key, the public half of the private key is
/// used for verification.
pub fn load_signature_module(
    public_key: Option<&Path>,
    private_key: Option<&Path>,
) -> Result<SignatureModule> {
    let private_key = private_key
        .map(|path| {
            let pem = read_pem(path)?;
            parse_private_key_pem(&pem)
                .with_context(|| format!("invalid private key {}", path.display()))
        })
        .transpose()?;

    let public_key = match public_key {
        Some(path) => {
            let pem = read_pem(path)?;
            Some(
                parse_public_key_pem(&pem)
                    .with_context(|| format!("invalid public key {}", path.display()))?,
            )
        }
        None => private_key.as_ref().map(RsaPrivateKey::to_public_key),
    };

    debug!(
        can_sign = private_key.is_some(),
        can_verify = public_key.is_some(),
        "loaded keys"
    );
    Ok(SignatureModule::new(private_key, public_key))
}

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
