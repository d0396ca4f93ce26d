//! Error types for envelope operations.

use thiserror::Error;

/// Errors from envelope encryption and decryption.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The AEAD cipher refused to encrypt. A library fault, not an input
    /// problem; the operation must be aborted rather than falling back to
    /// plaintext.
    #[error("content encryption failed")]
    EncryptionFailed,

    /// Authentication tag mismatch during content decryption. The
    /// ciphertext or nonce was tampered with or corrupted.
    #[error("authentication tag invalid")]
    AuthTagInvalid,

    /// OAEP wrapping of the content key failed.
    #[error("content key wrap failed: {reason}")]
    WrapFailure {
        /// Underlying cipher error.
        reason: String,
    },

    /// OAEP unwrapping failed or recovered the wrong number of bytes.
    /// Wrong private key or corrupted wrapped data.
    #[error("content key unwrap failed: {reason}")]
    UnwrapFailure {
        /// Underlying cipher error or length mismatch.
        reason: String,
    },

    /// Public key material could not be parsed.
    #[error("invalid public key: {reason}")]
    InvalidPublicKey {
        /// Parse failure detail.
        reason: String,
    },

    /// Private key material could not be parsed.
    #[error("invalid private key: {reason}")]
    InvalidPrivateKey {
        /// Parse failure detail.
        reason: String,
    },

    /// The RSA modulus is below the accepted minimum.
    #[error("RSA modulus too small: {bits} bits")]
    KeyTooSmall {
        /// Modulus size of the rejected key.
        bits: usize,
    },

    /// RSA key pair generation failed.
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Underlying library error.
        reason: String,
    },
}

impl EnvelopeError {
    /// Whether the error indicates tampering or a key mismatch rather than
    /// malformed local input.
    ///
    /// Security-relevant errors are logged distinctly and never retried
    /// with the same inputs.
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, Self::AuthTagInvalid | Self::UnwrapFailure { .. })
    }
}
