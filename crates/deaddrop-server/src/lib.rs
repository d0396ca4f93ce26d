//! Deaddrop relay.
//!
//! The server side of the envelope-encryption protocol: it holds the pool
//! of single-use public keys and the encrypted objects, and it never
//! possesses a private key. Compromising the relay's stored credentials
//! yields ciphertext and public halves only — no past or future submission
//! can be decrypted with anything the relay has.
//!
//! # Components
//!
//! - [`Storage`]: key ledger + object records behind one trait
//!   ([`MemoryStorage`] for tests, [`RedbStorage`] for durability)
//! - [`SubmissionService`]: the envelope encryptor
//! - [`RetrievalService`]: batched since-timestamp bundle assembly
//! - [`intake_public_key`]: validated entry of uploaded public halves
//! - [`ObjectStore`]: flat-file ciphertext storage with collision-suffix
//!   naming
//!
//! The HTTP/Tor transport in front of these services is deliberately
//! absent here; every operation takes explicit handles and plain values.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod intake;
mod object_store;
mod retrieval;
pub mod storage;
mod submission;

pub use intake::{IntakeError, PEM_CONTENT_TYPES, intake_public_key};
pub use object_store::ObjectStore;
pub use retrieval::{BundleObject, RetrievalError, RetrievalService};
pub use storage::{
    AllocatedKey, KeyStatus, MemoryStorage, RedbStorage, Storage, StorageError, StoredKey,
    StoredObject,
};
pub use submission::{SubmissionRequest, SubmissionService, SubmitError};
