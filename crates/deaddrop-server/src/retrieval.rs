//! Batched retrieval: everything created after a given time, in the
//! transfer-bundle shape the recipient consumes.
//!
//! Retrieval is best-effort per object: a record whose ciphertext file
//! has gone unreadable is skipped with an error log and the batch
//! continues. Only a fully empty result is an error (`NoNewObjects`, the
//! HTTP layer's 404).

use std::{fs, path::Path};

use deaddrop_proto::{
    KeyInfoRecord, ObjectId,
    bundle::{key_info_file_name, object_file_name},
};
use thiserror::Error;
use tracing::{error, info};

use crate::storage::{Storage, StorageError};

/// One object in the bundle shape: ciphertext plus its key-info record,
/// named for pairing.
#[derive(Debug, Clone)]
pub struct BundleObject {
    /// Object id (also the pairing prefix of both file names).
    pub id: ObjectId,
    /// Bundle file name of the ciphertext: `{id}_{original_name}`.
    pub file_name: String,
    /// Encrypted object bytes, tag included.
    pub ciphertext: Vec<u8>,
    /// The wrapped content key and decryption parameters.
    pub key_info: KeyInfoRecord,
}

/// Errors from batched retrieval.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Nothing was created after the requested time (or every candidate
    /// was unreadable). Recoverable; ask again later.
    #[error("no new objects since the requested time")]
    NoNewObjects,

    /// Ledger fault.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Bundle directory could not be written.
    #[error("bundle write failed: {0}")]
    Io(String),
}

/// Batched retrieval over a ledger.
#[derive(Clone)]
pub struct RetrievalService<S: Storage> {
    storage: S,
}

impl<S: Storage> RetrievalService<S> {
    /// Create a service over the given ledger.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// All objects created strictly after `since_secs`, oldest first.
    ///
    /// # Errors
    ///
    /// - `NoNewObjects` when the filtered result is empty
    /// - `Storage` on ledger faults
    pub fn fetch_since(&self, since_secs: u64) -> Result<Vec<BundleObject>, RetrievalError> {
        let records = self.storage.load_objects_since(since_secs)?;

        let mut objects = Vec::with_capacity(records.len());
        for record in records {
            let ciphertext = match fs::read(&record.path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!(
                        object_id = %record.id,
                        path = %record.path.display(),
                        %err,
                        "skipping object with unreadable ciphertext"
                    );
                    continue;
                },
            };

            objects.push(BundleObject {
                id: record.id,
                file_name: object_file_name(record.id, &record.file_name),
                ciphertext,
                key_info: KeyInfoRecord {
                    wrapped_key: record.wrapped_key,
                    nonce: record.nonce,
                    key_id: record.key_id,
                },
            });
        }

        if objects.is_empty() {
            return Err(RetrievalError::NoNewObjects);
        }

        info!(count = objects.len(), since_secs, "bundle assembled");
        Ok(objects)
    }

    /// Fetch and write the bundle into a directory, two files per object.
    ///
    /// Returns the number of objects written.
    pub fn export_to_dir(
        &self,
        since_secs: u64,
        out_dir: &Path,
    ) -> Result<usize, RetrievalError> {
        let objects = self.fetch_since(since_secs)?;

        fs::create_dir_all(out_dir).map_err(|e| RetrievalError::Io(e.to_string()))?;

        for object in &objects {
            fs::write(out_dir.join(&object.file_name), &object.ciphertext)
                .map_err(|e| RetrievalError::Io(e.to_string()))?;
            fs::write(out_dir.join(key_info_file_name(object.id)), object.key_info.encode())
                .map_err(|e| RetrievalError::Io(e.to_string()))?;
        }

        Ok(objects.len())
    }
}
