//! Deaddrop recipient.
//!
//! The client side of the envelope-encryption protocol. The recipient is
//! the only party that ever holds private key material: key pairs are
//! generated offline in bulk, the public halves are uploaded to the relay,
//! and retrieved bundles are decrypted locally against the vault.
//!
//! # Components
//!
//! - [`KeyVault`]: durable store of both key halves plus the `uploaded`
//!   flag. Private PEMs never leave this store.
//! - [`provision_keypairs`]: bulk offline generation into the vault.
//! - [`export_pending`]: the upload view — public halves and ids only.
//! - [`decrypt_object`] / [`decrypt_directory`]: the envelope decryptor,
//!   single object or whole bundle directory.
//!
//! Consumption of a key is never tracked here; the relay's allocator is
//! the source of truth, and the vault merely learns about it when a bundle
//! referencing the key arrives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod decryptor;
mod keygen;
mod sync;
mod vault;

pub use decryptor::{BatchSummary, DecryptError, decrypt_directory, decrypt_object};
pub use keygen::{ProvisionError, provision_keypairs};
pub use sync::{PEM_CONTENT_TYPE, PublicKeyExport, confirm_uploaded, export_pending};
pub use vault::{KeyVault, LocalKeyPair, VaultError};
