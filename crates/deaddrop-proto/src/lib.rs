//! Deaddrop transfer-bundle shapes.
//!
//! The relay and the recipient never share state directly; everything they
//! exchange flows through the shapes defined here:
//!
//! - [`KeyId`] / [`ObjectId`]: 128-bit random identifiers, rendered as
//!   32-character lower-case hex on the wire.
//! - [`KeyInfoRecord`]: the fixed three-field record carried beside each
//!   ciphertext, naming the wrapped content key, the AEAD nonce, and the
//!   public key id that wrapped it.
//! - [`bundle`]: the file-naming rules that pair a ciphertext with its
//!   key-info record inside a transfer bundle.
//!
//! This crate is pure parsing and encoding. No cryptography, no I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bundle;
mod error;
mod id;
mod key_info;

pub use error::BundleError;
pub use id::{ID_SIZE, KeyId, ObjectId, ParseIdError};
pub use key_info::{KeyInfoRecord, NONCE_LEN};
