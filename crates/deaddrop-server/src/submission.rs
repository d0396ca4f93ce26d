//! The envelope encryptor: turns one submitted plaintext into one stored
//! encrypted object.
//!
//! The submission path is fail-closed. Any error aborts the whole
//! operation: no object record, no ciphertext file, and never a plaintext
//! fallback. The single exception is the allocated key itself — once the
//! allocator marks a key `Consumed` that transition is final, even if a
//! later step fails. A wasted key is safer than a double-used one.

use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};

use deaddrop_crypto::{
    ContentKey, EnvelopeError, NONCE_SIZE, encrypt_content, parse_public_key_pem,
    wrap_content_key,
};
use deaddrop_proto::ObjectId;
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    object_store::ObjectStore,
    storage::{Storage, StorageError, StoredObject},
};

/// One submission: the plaintext plus the metadata stored beside it.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Original file name, kept for the transfer bundle.
    pub file_name: String,
    /// Declared content type of the original.
    pub content_type: String,
    /// Opaque reference to the submitting account.
    pub submitter: String,
    /// Document bytes to encrypt.
    pub plaintext: Vec<u8>,
}

/// Errors from the submission path.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The key pool is exhausted. Recoverable: retry once the pool has
    /// been replenished. Nothing was persisted.
    #[error("no public key available; try again later")]
    NoKeyAvailable,

    /// Cipher-layer fault. Fatal for this submission.
    #[error("envelope encryption failed: {0}")]
    Encryption(#[from] EnvelopeError),

    /// Ledger fault.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Ciphertext file could not be written.
    #[error("object write failed: {0}")]
    Io(String),
}

/// Envelope encryptor bound to a ledger and an object store.
///
/// Holds explicit handles rather than ambient globals; encryption itself
/// touches no shared mutable state, so submissions may run fully in
/// parallel — the allocator inside `storage` is the only serialization
/// point.
#[derive(Clone)]
pub struct SubmissionService<S: Storage> {
    storage: S,
    objects: ObjectStore,
}

impl<S: Storage> SubmissionService<S> {
    /// Create a service over the given ledger and object store.
    pub fn new(storage: S, objects: ObjectStore) -> Self {
        Self { storage, objects }
    }

    /// Encrypt and persist one submission, returning the new object id.
    ///
    /// Contract order: fresh content key and nonce, symmetric encryption,
    /// key allocation, key wrapping, persistence. On `NoKeyAvailable` the
    /// caller must not retry without backoff and must not proceed
    /// unencrypted.
    pub fn submit(&self, request: SubmissionRequest) -> Result<ObjectId, SubmitError> {
        let content_key = ContentKey::generate(&mut OsRng);
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = encrypt_content(&request.plaintext, &content_key, &nonce)?;

        let Some(allocated) = self.storage.allocate_key()? else {
            warn!("submission refused: key pool exhausted");
            return Err(SubmitError::NoKeyAvailable);
        };
        debug!(key_id = %allocated.id, "allocated wrapping key");

        let public_key = parse_public_key_pem(&allocated.public_key_pem)?;
        let wrapped_key = wrap_content_key(&mut OsRng, &content_key, &public_key)?;

        let mut id_bytes = [0u8; 16];
        OsRng.fill_bytes(&mut id_bytes);
        let id = ObjectId::from_bytes(id_bytes);

        let path = self
            .objects
            .write(&request.file_name, &ciphertext)
            .map_err(|e| SubmitError::Io(e.to_string()))?;

        let object = StoredObject {
            id,
            file_name: request.file_name,
            content_type: request.content_type,
            submitter: request.submitter,
            path: path.clone(),
            nonce,
            wrapped_key,
            key_id: allocated.id,
            created_at_secs: now_unix_secs(),
        };

        if let Err(err) = self.storage.store_object(&object) {
            // Don't leave an orphan blob behind a failed record write. The
            // consumed key stays consumed.
            let _ = fs::remove_file(&path);
            return Err(err.into());
        }

        info!(object_id = %id, key_id = %allocated.id, path = %path.display(), "object stored");

        Ok(id)
    }
}

/// Current time as unix seconds. A clock before the epoch reads as 0.
fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use deaddrop_crypto::{
        GeneratedKeyPair, MIN_MODULUS_BITS, TAG_SIZE, decrypt_content, generate_keypair,
        parse_private_key_pem, unwrap_content_key,
    };
    use deaddrop_proto::KeyId;
    use tempfile::tempdir;

    use super::*;
    use crate::storage::{KeyStatus, MemoryStorage};

    fn test_pair() -> &'static GeneratedKeyPair {
        static PAIR: OnceLock<GeneratedKeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_keypair(&mut OsRng, MIN_MODULUS_BITS).expect("keygen failed"))
    }

    fn request(plaintext: &[u8]) -> SubmissionRequest {
        SubmissionRequest {
            file_name: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            submitter: "anonymous".to_string(),
            plaintext: plaintext.to_vec(),
        }
    }

    fn service_with_one_key(dir: &std::path::Path) -> (SubmissionService<MemoryStorage>, KeyId) {
        let storage = MemoryStorage::new();
        let key_id = KeyId::from_bytes([1; 16]);
        storage.insert_public_key(key_id, &test_pair().public_key_pem).unwrap();

        (SubmissionService::new(storage.clone(), ObjectStore::new(dir)), key_id)
    }

    #[test]
    fn submit_consumes_exactly_one_key() {
        let dir = tempdir().unwrap();
        let (service, key_id) = service_with_one_key(dir.path());
        let storage = service.storage.clone();

        service.submit(request(b"hello")).unwrap();

        assert_eq!(storage.key_status(key_id).unwrap(), Some(KeyStatus::Consumed));
        assert_eq!(storage.available_key_count().unwrap(), 0);
    }

    #[test]
    fn exhausted_pool_aborts_with_no_object() {
        let dir = tempdir().unwrap();
        let (service, _) = service_with_one_key(dir.path());
        let storage = service.storage.clone();

        service.submit(request(b"first")).unwrap();
        let result = service.submit(request(b"second"));

        assert!(matches!(result, Err(SubmitError::NoKeyAvailable)));
        assert_eq!(storage.object_count().unwrap(), 1);
    }

    #[test]
    fn stored_object_round_trips_through_the_envelope() {
        let dir = tempdir().unwrap();
        let (service, key_id) = service_with_one_key(dir.path());
        let storage = service.storage.clone();

        let id = service.submit(request(b"hello")).unwrap();
        let object = storage.load_object(id).unwrap().unwrap();

        assert_eq!(object.key_id, key_id);
        assert_eq!(object.file_name, "report.pdf");
        assert_eq!(object.wrapped_key.len(), MIN_MODULUS_BITS / 8);

        let private = parse_private_key_pem(&test_pair().private_key_pem).unwrap();
        let content_key = unwrap_content_key(&object.wrapped_key, &private).unwrap();

        let ciphertext = fs::read(&object.path).unwrap();
        assert_eq!(ciphertext.len(), b"hello".len() + TAG_SIZE);

        let plaintext = decrypt_content(&ciphertext, &content_key, &object.nonce).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn plaintext_never_lands_on_disk() {
        let dir = tempdir().unwrap();
        let (service, _) = service_with_one_key(dir.path());

        let secret = b"very identifiable secret content";
        let id = service.submit(request(secret)).unwrap();
        let object = service.storage.load_object(id).unwrap().unwrap();

        let on_disk = fs::read(&object.path).unwrap();
        assert_ne!(on_disk, secret.to_vec());
        assert!(!on_disk.windows(secret.len()).any(|w| w == secret));
    }

    #[test]
    fn empty_plaintext_is_accepted() {
        let dir = tempdir().unwrap();
        let (service, _) = service_with_one_key(dir.path());

        let id = service.submit(request(b"")).unwrap();
        let object = service.storage.load_object(id).unwrap().unwrap();

        assert_eq!(fs::read(&object.path).unwrap().len(), TAG_SIZE);
    }

    #[test]
    fn colliding_file_names_get_distinct_paths() {
        let dir = tempdir().unwrap();
        let storage = MemoryStorage::new();
        storage.insert_public_key(KeyId::from_bytes([1; 16]), &test_pair().public_key_pem).unwrap();
        storage.insert_public_key(KeyId::from_bytes([2; 16]), &test_pair().public_key_pem).unwrap();
        let service = SubmissionService::new(storage.clone(), ObjectStore::new(dir.path()));

        let first = service.submit(request(b"one")).unwrap();
        let second = service.submit(request(b"two")).unwrap();

        let first_path = storage.load_object(first).unwrap().unwrap().path;
        let second_path = storage.load_object(second).unwrap().unwrap().path;

        assert_ne!(first_path, second_path);
        assert_eq!(fs::read(second_path).unwrap().len(), b"two".len() + TAG_SIZE);
    }
}
