//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. All
//! state survives server restarts. Redb admits one write transaction at a
//! time, which is exactly the serialization the allocator needs: the
//! scan-for-available and mark-consumed steps run inside a single write
//! transaction, so concurrent allocators can never hand out the same key.

use std::{path::Path, sync::Arc};

use deaddrop_proto::{ID_SIZE, KeyId, ObjectId};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::{AllocatedKey, KeyStatus, Storage, StorageError, StoredKey, StoredObject};

/// Table: public keys
/// Key: key id as big-endian bytes [16 bytes]
/// Value: CBOR-encoded `StoredKey`
const KEYS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("public_keys");

/// Table: object records
/// Key: object id as big-endian bytes [16 bytes]
/// Value: CBOR-encoded `StoredObject`
const OBJECTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("objects");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist (KEYS, OBJECTS).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(KEYS).map_err(|e| StorageError::Io(e.to_string()))?;
            let _ = txn.open_table(OBJECTS).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn count_keys_with_status(&self, status: KeyStatus) -> Result<usize, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(KEYS).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut count = 0;
        for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (_, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;
            let stored: StoredKey = ciborium::from_reader(value.value())
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            if stored.status == status {
                count += 1;
            }
        }

        Ok(count)
    }
}

impl Storage for RedbStorage {
    fn insert_public_key(&self, id: KeyId, public_key_pem: &str) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(KEYS).map_err(|e| StorageError::Io(e.to_string()))?;

            if table
                .get(id.as_bytes().as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?
                .is_some()
            {
                return Err(StorageError::DuplicateKey(id));
            }

            let stored = StoredKey {
                public_key_pem: public_key_pem.to_string(),
                status: KeyStatus::Available,
            };
            let mut bytes = Vec::new();
            ciborium::into_writer(&stored, &mut bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;

            table
                .insert(id.as_bytes().as_slice(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    fn allocate_key(&self) -> Result<Option<AllocatedKey>, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let allocated = {
            let mut table = txn.open_table(KEYS).map_err(|e| StorageError::Io(e.to_string()))?;

            // Scan for the first available row (id order). The scan and the
            // mark below share one write transaction.
            let mut found: Option<(KeyId, StoredKey)> = None;
            for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
                let (key, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;
                let stored: StoredKey = ciborium::from_reader(value.value())
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;

                if stored.status == KeyStatus::Available {
                    found = Some((decode_key_id(key.value())?, stored));
                    break;
                }
            }

            match found {
                Some((id, mut stored)) => {
                    stored.status = KeyStatus::Consumed;

                    let mut bytes = Vec::new();
                    ciborium::into_writer(&stored, &mut bytes)
                        .map_err(|e| StorageError::Serialization(e.to_string()))?;
                    table
                        .insert(id.as_bytes().as_slice(), bytes.as_slice())
                        .map_err(|e| StorageError::Io(e.to_string()))?;

                    Some(AllocatedKey { id, public_key_pem: stored.public_key_pem })
                },
                None => None,
            }
        };

        // Commit before returning: the consumed status must be durable by
        // the time any caller holds the key.
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(allocated)
    }

    fn key_status(&self, id: KeyId) -> Result<Option<KeyStatus>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(KEYS).map_err(|e| StorageError::Io(e.to_string()))?;

        match table.get(id.as_bytes().as_slice()).map_err(|e| StorageError::Io(e.to_string()))? {
            Some(value) => {
                let stored: StoredKey = ciborium::from_reader(value.value())
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(stored.status))
            },
            None => Ok(None),
        }
    }

    fn available_key_count(&self) -> Result<usize, StorageError> {
        self.count_keys_with_status(KeyStatus::Available)
    }

    fn consumed_key_count(&self) -> Result<usize, StorageError> {
        self.count_keys_with_status(KeyStatus::Consumed)
    }

    fn store_object(&self, object: &StoredObject) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(OBJECTS).map_err(|e| StorageError::Io(e.to_string()))?;

            if table
                .get(object.id.as_bytes().as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?
                .is_some()
            {
                return Err(StorageError::DuplicateObject(object.id));
            }

            let mut bytes = Vec::new();
            ciborium::into_writer(object, &mut bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;

            table
                .insert(object.id.as_bytes().as_slice(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    fn load_object(&self, id: ObjectId) -> Result<Option<StoredObject>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(OBJECTS).map_err(|e| StorageError::Io(e.to_string()))?;

        match table.get(id.as_bytes().as_slice()).map_err(|e| StorageError::Io(e.to_string()))? {
            Some(value) => {
                let object: StoredObject = ciborium::from_reader(value.value())
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(object))
            },
            None => Ok(None),
        }
    }

    fn load_objects_since(&self, since_secs: u64) -> Result<Vec<StoredObject>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(OBJECTS).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut objects = Vec::new();
        for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (_, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;
            let object: StoredObject = ciborium::from_reader(value.value())
                .map_err(|e| StorageError::Serialization(e.to_string()))?;

            if object.created_at_secs > since_secs {
                objects.push(object);
            }
        }

        objects.sort_by_key(|o| (o.created_at_secs, o.id));

        Ok(objects)
    }

    fn object_count(&self) -> Result<usize, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(OBJECTS).map_err(|e| StorageError::Io(e.to_string()))?;

        table.len().map(|n| n as usize).map_err(|e| StorageError::Io(e.to_string()))
    }
}

/// Decode a 16-byte table key back into a `KeyId`.
fn decode_key_id(bytes: &[u8]) -> Result<KeyId, StorageError> {
    let raw: [u8; ID_SIZE] = bytes
        .try_into()
        .map_err(|_| StorageError::Serialization(format!("key id has {} bytes", bytes.len())))?;
    Ok(KeyId::from_bytes(raw))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn key_id(n: u8) -> KeyId {
        KeyId::from_bytes([n; 16])
    }

    fn object(n: u8, created_at_secs: u64) -> StoredObject {
        StoredObject {
            id: ObjectId::from_bytes([n; 16]),
            file_name: format!("file_{n}.pdf"),
            content_type: "application/pdf".to_string(),
            submitter: "submitter".to_string(),
            path: format!("/tmp/file_{n}").into(),
            nonce: [n; 12],
            wrapped_key: vec![n; 256],
            key_id: key_id(n),
            created_at_secs,
        }
    }

    #[test]
    fn insert_and_allocate() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        storage.insert_public_key(key_id(1), "pem-1").unwrap();
        assert_eq!(storage.available_key_count().unwrap(), 1);

        let allocated = storage.allocate_key().unwrap().unwrap();
        assert_eq!(allocated.id, key_id(1));
        assert_eq!(allocated.public_key_pem, "pem-1");

        assert_eq!(storage.key_status(key_id(1)).unwrap(), Some(KeyStatus::Consumed));
        assert_eq!(storage.available_key_count().unwrap(), 0);
        assert_eq!(storage.consumed_key_count().unwrap(), 1);
    }

    #[test]
    fn allocation_skips_consumed_rows() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        storage.insert_public_key(key_id(1), "pem-1").unwrap();
        storage.insert_public_key(key_id(2), "pem-2").unwrap();

        let first = storage.allocate_key().unwrap().unwrap();
        let second = storage.allocate_key().unwrap().unwrap();

        assert_ne!(first.id, second.id);
        assert!(storage.allocate_key().unwrap().is_none());
    }

    #[test]
    fn empty_pool_leaves_no_mutation() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        assert!(storage.allocate_key().unwrap().is_none());
        assert!(storage.allocate_key().unwrap().is_none());

        assert_eq!(storage.available_key_count().unwrap(), 0);
        assert_eq!(storage.consumed_key_count().unwrap(), 0);
    }

    #[test]
    fn duplicate_key_rejected() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        storage.insert_public_key(key_id(1), "pem").unwrap();
        let result = storage.insert_public_key(key_id(1), "other");

        assert_eq!(result, Err(StorageError::DuplicateKey(key_id(1))));
        assert_eq!(storage.available_key_count().unwrap(), 1);
    }

    #[test]
    fn consumed_status_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");

        {
            let storage = RedbStorage::open(&path).unwrap();
            storage.insert_public_key(key_id(1), "pem").unwrap();
            storage.allocate_key().unwrap().unwrap();
        }

        let reopened = RedbStorage::open(&path).unwrap();
        assert_eq!(reopened.key_status(key_id(1)).unwrap(), Some(KeyStatus::Consumed));
        assert!(reopened.allocate_key().unwrap().is_none());
    }

    #[test]
    fn object_record_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        let stored = object(1, 1_234_567_890);
        storage.store_object(&stored).unwrap();

        let loaded = storage.load_object(stored.id).unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(storage.object_count().unwrap(), 1);
    }

    #[test]
    fn duplicate_object_rejected() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        let stored = object(1, 100);
        storage.store_object(&stored).unwrap();

        assert_eq!(
            storage.store_object(&stored),
            Err(StorageError::DuplicateObject(stored.id))
        );
    }

    #[test]
    fn since_filter_strict_and_sorted() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        storage.store_object(&object(3, 300)).unwrap();
        storage.store_object(&object(1, 100)).unwrap();
        storage.store_object(&object(2, 200)).unwrap();

        let since_100 = storage.load_objects_since(100).unwrap();
        let times: Vec<u64> = since_100.iter().map(|o| o.created_at_secs).collect();
        assert_eq!(times, vec![200, 300]);

        assert!(storage.load_objects_since(300).unwrap().is_empty());
    }

    #[test]
    fn load_missing_object_is_none() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        assert!(storage.load_object(ObjectId::from_bytes([9; 16])).unwrap().is_none());
    }
}
