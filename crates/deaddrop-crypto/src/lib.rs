//! Deaddrop Cryptographic Primitives
//!
//! Envelope-encryption building blocks. Pure functions with no I/O and no
//! global state; callers provide the RNG handle, which keeps the primitives
//! testable and keeps randomness decisions at the edge.
//!
//! # Envelope Lifecycle
//!
//! Each submitted document gets its own symmetric content key, and each
//! content key is protected by a single-use asymmetric key pair:
//!
//! ```text
//! fresh 256-bit content key + fresh 12-byte nonce
//!        │
//!        ▼
//! AES-256-GCM → ciphertext (tag appended)
//!
//! content key
//!        │
//!        ▼
//! RSA-OAEP(SHA-256/MGF1-SHA-256) under one allocated public key
//!        │
//!        ▼
//! wrapped content key (modulus-sized)
//! ```
//!
//! The recipient reverses the right-hand column first: OAEP-unwrap with the
//! matching private key, validate the recovered key is exactly 32 bytes,
//! then AEAD-decrypt the content. A failed authentication tag rejects the
//! object outright; partial plaintext is never surfaced.
//!
//! # Security
//!
//! One-time key assignment:
//! - Each public key wraps at most one content key (enforced by the relay's
//!   allocator, not here — these primitives trust their inputs)
//! - Compromising one private key exposes exactly one object
//!
//! Nonce discipline:
//! - A fresh random content key per object means the (key, nonce) pair is
//!   structurally never reused, even across identical plaintexts
//!
//! Authenticity:
//! - AES-GCM's tag covers the full ciphertext; any bit flip fails decryption
//! - OAEP provides semantic security for the wrapped key

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;

pub use envelope::{
    CONTENT_KEY_SIZE, ContentKey, EnvelopeError, GeneratedKeyPair, MIN_MODULUS_BITS, NONCE_SIZE,
    TAG_SIZE, decrypt_content, encrypt_content, generate_keypair, parse_private_key_pem,
    parse_public_key_pem, unwrap_content_key, wrap_content_key, wrapped_key_size,
};
