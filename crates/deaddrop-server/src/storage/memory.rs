#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]
#![allow(clippy::expect_used, reason = "Mutex poisoning should cause a panic")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use deaddrop_proto::{KeyId, ObjectId};

use super::{AllocatedKey, KeyStatus, Storage, StorageError, StoredKey, StoredObject};

/// In-memory storage implementation for testing and simulation.
///
/// Keys are allocated in insertion order. All state is wrapped in
/// Arc<Mutex<>> to allow Clone and concurrent access; the whole
/// read-then-mark allocation sequence runs under one lock acquisition, so
/// the exactly-once guarantee holds under concurrent callers.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

struct MemoryStorageInner {
    /// Ledger rows by key id.
    keys: HashMap<KeyId, StoredKey>,

    /// Key insertion order; allocation scans this front to back.
    key_order: Vec<KeyId>,

    /// Object records by object id.
    objects: HashMap<ObjectId, StoredObject>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStorageInner {
                keys: HashMap::new(),
                key_order: Vec::new(),
                objects: HashMap::new(),
            })),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn insert_public_key(&self, id: KeyId, public_key_pem: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        if inner.keys.contains_key(&id) {
            return Err(StorageError::DuplicateKey(id));
        }

        inner.keys.insert(
            id,
            StoredKey { public_key_pem: public_key_pem.to_string(), status: KeyStatus::Available },
        );
        inner.key_order.push(id);

        Ok(())
    }

    fn allocate_key(&self) -> Result<Option<AllocatedKey>, StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let Some(id) = inner
            .key_order
            .iter()
            .copied()
            .find(|id| inner.keys.get(id).is_some_and(|k| k.status == KeyStatus::Available))
        else {
            return Ok(None);
        };

        let Some(stored) = inner.keys.get_mut(&id) else {
            return Ok(None);
        };
        stored.status = KeyStatus::Consumed;

        Ok(Some(AllocatedKey { id, public_key_pem: stored.public_key_pem.clone() }))
    }

    fn key_status(&self, id: KeyId) -> Result<Option<KeyStatus>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.keys.get(&id).map(|k| k.status))
    }

    fn available_key_count(&self) -> Result<usize, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.keys.values().filter(|k| k.status == KeyStatus::Available).count())
    }

    fn consumed_key_count(&self) -> Result<usize, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.keys.values().filter(|k| k.status == KeyStatus::Consumed).count())
    }

    fn store_object(&self, object: &StoredObject) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        if inner.objects.contains_key(&object.id) {
            return Err(StorageError::DuplicateObject(object.id));
        }

        inner.objects.insert(object.id, object.clone());
        Ok(())
    }

    fn load_object(&self, id: ObjectId) -> Result<Option<StoredObject>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.objects.get(&id).cloned())
    }

    fn load_objects_since(&self, since_secs: u64) -> Result<Vec<StoredObject>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let mut objects: Vec<StoredObject> =
            inner.objects.values().filter(|o| o.created_at_secs > since_secs).cloned().collect();
        objects.sort_by_key(|o| (o.created_at_secs, o.id));

        Ok(objects)
    }

    fn object_count(&self) -> Result<usize, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.objects.len())
    }
}
