//! Content encryption using AES-256-GCM.
//!
//! Pure functions - key and nonce bytes must be provided by the caller.
//! A fresh random key and nonce per object is the caller's contract; these
//! functions never reuse or derive anything themselves.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use zeroize::Zeroize;

use super::error::EnvelopeError;

/// Size of the symmetric content key (256 bits).
pub const CONTENT_KEY_SIZE: usize = 32;

/// Size of the AEAD nonce (96 bits, the AES-GCM standard).
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag appended to the ciphertext.
pub const TAG_SIZE: usize = 16;

/// A per-object symmetric key.
///
/// Generated fresh for every encryption and wrapped under exactly one
/// public key. Zeroized on drop.
pub struct ContentKey {
    key: [u8; CONTENT_KEY_SIZE],
}

impl ContentKey {
    /// Build a content key from caller-supplied random bytes.
    pub fn from_bytes(key: [u8; CONTENT_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Generate a fresh content key from a cryptographically secure RNG.
    pub fn generate(rng: &mut impl rand_core::CryptoRngCore) -> Self {
        let mut key = Self { key: [0u8; CONTENT_KEY_SIZE] };
        rng.fill_bytes(&mut key.key);
        key
    }

    /// Raw key bytes, for wrapping under a public key.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.key
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Encrypt content with AES-256-GCM.
///
/// Returns the ciphertext with the 16-byte authentication tag appended. No
/// associated data is bound.
///
/// # Errors
///
/// - `EncryptionFailed`: cipher library fault. Never returns plaintext.
pub fn encrypt_content(
    plaintext: &[u8],
    key: &ContentKey,
    nonce: &[u8; NONCE_SIZE],
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| EnvelopeError::EncryptionFailed)?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| EnvelopeError::EncryptionFailed)
}

/// Decrypt content with AES-256-GCM.
///
/// Returns plaintext byte-identical to what was encrypted, for any length
/// including zero.
///
/// # Errors
///
/// - `AuthTagInvalid`: tag mismatch (tamper or corruption). No partial
///   plaintext is surfaced.
pub fn decrypt_content(
    ciphertext: &[u8],
    key: &ContentKey,
    nonce: &[u8; NONCE_SIZE],
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| EnvelopeError::AuthTagInvalid)?;

    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| EnvelopeError::AuthTagInvalid)
}
