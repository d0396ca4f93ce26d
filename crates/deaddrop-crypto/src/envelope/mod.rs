//! Envelope encryption: symmetric content encryption plus asymmetric key
//! wrapping.
//!
//! Split by concern:
//! - [`content`]: AES-256-GCM over the document bytes
//! - [`wrap`]: RSA-OAEP over the 32-byte content key
//! - [`keys`]: RSA key pair generation and PEM (de)serialization

mod content;
mod error;
mod keys;
mod wrap;

pub use content::{CONTENT_KEY_SIZE, ContentKey, NONCE_SIZE, TAG_SIZE, decrypt_content, encrypt_content};
pub use error::EnvelopeError;
pub use keys::{GeneratedKeyPair, generate_keypair, parse_private_key_pem, parse_public_key_pem};
pub use wrap::{MIN_MODULUS_BITS, unwrap_content_key, wrap_content_key, wrapped_key_size};
