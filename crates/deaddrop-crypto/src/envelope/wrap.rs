//! Content-key wrapping using RSA-OAEP.
//!
//! OAEP is parameterized with SHA-256 for both the hash and the MGF1 mask
//! generation. The 32-byte content key is the only payload ever wrapped
//! this way.

use rsa::{Oaep, RsaPrivateKey, RsaPublicKey, traits::PublicKeyParts};
use sha2::Sha256;
use zeroize::Zeroize;

use super::{
    content::{CONTENT_KEY_SIZE, ContentKey},
    error::EnvelopeError,
};

/// Minimum accepted RSA modulus size in bits.
pub const MIN_MODULUS_BITS: usize = 2048;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Reject keys below the modulus floor.
fn check_modulus(bits: usize) -> Result<(), EnvelopeError> {
    if bits < MIN_MODULUS_BITS {
        return Err(EnvelopeError::KeyTooSmall { bits });
    }
    Ok(())
}

/// Wrap a content key under a public key.
///
/// Returns the OAEP ciphertext; its length equals the modulus size in
/// bytes.
///
/// # Errors
///
/// - `KeyTooSmall`: modulus below [`MIN_MODULUS_BITS`]
/// - `WrapFailure`: cipher library fault
pub fn wrap_content_key(
    rng: &mut impl rand_core::CryptoRngCore,
    key: &ContentKey,
    public_key: &RsaPublicKey,
) -> Result<Vec<u8>, EnvelopeError> {
    check_modulus(public_key.n().bits())?;

    public_key
        .encrypt(rng, oaep(), key.as_bytes())
        .map_err(|e| EnvelopeError::WrapFailure { reason: e.to_string() })
}

/// Unwrap a content key with the matching private key.
///
/// Validates that exactly [`CONTENT_KEY_SIZE`] bytes were recovered; any
/// other length means the wrong key or corrupted wrapped data.
///
/// # Errors
///
/// - `UnwrapFailure`: OAEP failure or recovered-length mismatch
pub fn unwrap_content_key(
    wrapped: &[u8],
    private_key: &RsaPrivateKey,
) -> Result<ContentKey, EnvelopeError> {
    let mut recovered = private_key
        .decrypt(oaep(), wrapped)
        .map_err(|e| EnvelopeError::UnwrapFailure { reason: e.to_string() })?;

    if recovered.len() != CONTENT_KEY_SIZE {
        recovered.zeroize();
        return Err(EnvelopeError::UnwrapFailure {
            reason: format!("recovered {} bytes, expected {CONTENT_KEY_SIZE}", recovered.len()),
        });
    }

    let mut key = [0u8; CONTENT_KEY_SIZE];
    key.copy_from_slice(&recovered);
    recovered.zeroize();

    Ok(ContentKey::from_bytes(key))
}

/// Size in bytes of the wrapped-key ciphertext a public key will produce.
pub fn wrapped_key_size(public_key: &RsaPublicKey) -> usize {
    public_key.size()
}
