//! Storage error types.
//!
//! Defines errors that can occur against the relay's ledger:
//! - `DuplicateKey` / `DuplicateObject`: id collision on insert
//! - `Serialization`: failed to encode/decode a stored record
//! - `Io`: underlying storage system errors

use deaddrop_proto::{KeyId, ObjectId};
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A public key with this id already exists in the ledger.
    ///
    /// Ids are assigned once at generation time; re-inserting one means the
    /// provisioning side re-sent a key that was already uploaded.
    #[error("public key already exists: {0}")]
    DuplicateKey(KeyId),

    /// An object record with this id already exists.
    #[error("object already exists: {0}")]
    DuplicateObject(ObjectId),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.).
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
