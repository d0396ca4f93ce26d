//! The recipient's key vault.
//!
//! Redb-backed store of locally generated key pairs: both PEM halves plus
//! an `uploaded` flag tracking whether the public half has been pushed to
//! the relay. The private half is returned only by [`KeyVault::private_key_pem`]
//! for local decryption; no listing or export surface includes it.

use std::{path::Path, sync::Arc};

use deaddrop_proto::{ID_SIZE, KeyId};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Table: key pairs
/// Key: key id as big-endian bytes [16 bytes]
/// Value: CBOR-encoded `LocalKeyPair`
const KEY_PAIRS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("key_pairs");

/// One locally generated key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalKeyPair {
    /// SPKI PEM public half (the uploadable part).
    pub public_key_pem: String,
    /// PKCS#8 PEM private half. Never leaves the vault.
    pub private_key_pem: String,
    /// Whether the public half has been pushed to the relay.
    pub uploaded: bool,
}

/// Errors from vault operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// A key pair with this id already exists.
    #[error("key pair already exists: {0}")]
    DuplicateKey(KeyId),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.).
    #[error("I/O error: {0}")]
    Io(String),
}

/// Durable vault backed by Redb. Clone is cheap (Arc).
#[derive(Clone)]
pub struct KeyVault {
    db: Arc<Database>,
}

impl KeyVault {
    /// Open or create a vault database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let db = Database::create(path.as_ref()).map_err(|e| VaultError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| VaultError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(KEY_PAIRS).map_err(|e| VaultError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| VaultError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert one freshly generated pair (not yet uploaded).
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the id is already present.
    pub fn insert(&self, id: KeyId, pair: &LocalKeyPair) -> Result<(), VaultError> {
        let txn = self.db.begin_write().map_err(|e| VaultError::Io(e.to_string()))?;

        {
            let mut table =
                txn.open_table(KEY_PAIRS).map_err(|e| VaultError::Io(e.to_string()))?;

            if table
                .get(id.as_bytes().as_slice())
                .map_err(|e| VaultError::Io(e.to_string()))?
                .is_some()
            {
                return Err(VaultError::DuplicateKey(id));
            }

            let mut bytes = Vec::new();
            ciborium::into_writer(pair, &mut bytes)
                .map_err(|e| VaultError::Serialization(e.to_string()))?;

            table
                .insert(id.as_bytes().as_slice(), bytes.as_slice())
                .map_err(|e| VaultError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| VaultError::Io(e.to_string()))?;

        Ok(())
    }

    /// Private half for a key id, `None` if the pair isn't in this vault.
    ///
    /// The only accessor that surfaces private material; callers use it
    /// for local decryption and nothing else.
    pub fn private_key_pem(&self, id: KeyId) -> Result<Option<String>, VaultError> {
        Ok(self.load(id)?.map(|pair| pair.private_key_pem))
    }

    /// Ids and public halves of every pair not yet uploaded, id order.
    pub fn pending_upload(&self) -> Result<Vec<(KeyId, String)>, VaultError> {
        let txn = self.db.begin_read().map_err(|e| VaultError::Io(e.to_string()))?;
        let table = txn.open_table(KEY_PAIRS).map_err(|e| VaultError::Io(e.to_string()))?;

        let mut pending = Vec::new();
        for result in table.iter().map_err(|e| VaultError::Io(e.to_string()))? {
            let (key, value) = result.map_err(|e| VaultError::Io(e.to_string()))?;
            let pair: LocalKeyPair = ciborium::from_reader(value.value())
                .map_err(|e| VaultError::Serialization(e.to_string()))?;

            if !pair.uploaded {
                pending.push((decode_key_id(key.value())?, pair.public_key_pem));
            }
        }

        Ok(pending)
    }

    /// Flip the `uploaded` flag for the given ids. Unknown ids are
    /// ignored; the relay confirmed what it confirmed.
    pub fn mark_uploaded(&self, ids: &[KeyId]) -> Result<(), VaultError> {
        let txn = self.db.begin_write().map_err(|e| VaultError::Io(e.to_string()))?;

        {
            let mut table =
                txn.open_table(KEY_PAIRS).map_err(|e| VaultError::Io(e.to_string()))?;

            for id in ids {
                let Some(mut pair) = read_pair(&table, *id)? else {
                    continue;
                };
                pair.uploaded = true;

                let mut bytes = Vec::new();
                ciborium::into_writer(&pair, &mut bytes)
                    .map_err(|e| VaultError::Serialization(e.to_string()))?;
                table
                    .insert(id.as_bytes().as_slice(), bytes.as_slice())
                    .map_err(|e| VaultError::Io(e.to_string()))?;
            }
        }

        txn.commit().map_err(|e| VaultError::Io(e.to_string()))?;

        Ok(())
    }

    /// Total number of key pairs in the vault.
    pub fn key_count(&self) -> Result<usize, VaultError> {
        let txn = self.db.begin_read().map_err(|e| VaultError::Io(e.to_string()))?;
        let table = txn.open_table(KEY_PAIRS).map_err(|e| VaultError::Io(e.to_string()))?;

        table.len().map(|n| n as usize).map_err(|e| VaultError::Io(e.to_string()))
    }

    fn load(&self, id: KeyId) -> Result<Option<LocalKeyPair>, VaultError> {
        let txn = self.db.begin_read().map_err(|e| VaultError::Io(e.to_string()))?;
        let table = txn.open_table(KEY_PAIRS).map_err(|e| VaultError::Io(e.to_string()))?;

        read_pair(&table, id)
    }
}

fn read_pair<T>(table: &T, id: KeyId) -> Result<Option<LocalKeyPair>, VaultError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    match table.get(id.as_bytes().as_slice()).map_err(|e| VaultError::Io(e.to_string()))? {
        Some(value) => {
            let pair: LocalKeyPair = ciborium::from_reader(value.value())
                .map_err(|e| VaultError::Serialization(e.to_string()))?;
            Ok(Some(pair))
        },
        None => Ok(None),
    }
}

/// Decode a 16-byte table key back into a `KeyId`.
fn decode_key_id(bytes: &[u8]) -> Result<KeyId, VaultError> {
    let raw: [u8; ID_SIZE] = bytes
        .try_into()
        .map_err(|_| VaultError::Serialization(format!("key id has {} bytes", bytes.len())))?;
    Ok(KeyId::from_bytes(raw))
}
