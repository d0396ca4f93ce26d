//! Bulk offline key generation.
//!
//! Key pairs are generated on the recipient's machine, never on the relay.
//! Each pair gets a fresh random id and lands in the vault with
//! `uploaded = false`; the upload step is a separate, explicit action.

use deaddrop_crypto::EnvelopeError;
use deaddrop_proto::KeyId;
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;
use tracing::info;

use crate::vault::{KeyVault, LocalKeyPair, VaultError};

/// Errors from key provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Key generation or serialization failed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Vault fault.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Generate `count` RSA key pairs of `bits` modulus into the vault.
///
/// Returns the assigned ids. RSA generation is slow by design; expect
/// seconds per key at larger sizes.
///
/// # Errors
///
/// Fails on the first pair that cannot be generated or stored; earlier
/// pairs remain in the vault.
pub fn provision_keypairs(
    vault: &KeyVault,
    count: usize,
    bits: usize,
) -> Result<Vec<KeyId>, ProvisionError> {
    let mut ids = Vec::with_capacity(count);

    for n in 0..count {
        let generated = deaddrop_crypto::generate_keypair(&mut OsRng, bits)?;

        let mut id_bytes = [0u8; 16];
        OsRng.fill_bytes(&mut id_bytes);
        let id = KeyId::from_bytes(id_bytes);

        vault.insert(
            id,
            &LocalKeyPair {
                public_key_pem: generated.public_key_pem,
                private_key_pem: generated.private_key_pem,
                uploaded: false,
            },
        )?;

        info!(key_id = %id, generated = n + 1, of = count, "key pair provisioned");
        ids.push(id);
    }

    Ok(ids)
}
