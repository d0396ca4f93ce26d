//! Storage abstraction for the relay's key ledger and object records.
//!
//! Trait-based abstraction over the two durable tables the core owns: the
//! pool of single-use public keys and the encrypted-object records. The
//! trait is synchronous; cipher work and ledger writes are short and the
//! surrounding transport owns any timeout policy.

mod error;
mod memory;
mod redb;

use std::path::PathBuf;

use deaddrop_proto::{KeyId, NONCE_LEN, ObjectId};
pub use error::StorageError;
pub use memory::MemoryStorage;
use serde::{Deserialize, Serialize};

pub use self::redb::RedbStorage;

/// Lifecycle state of a ledger key.
///
/// The only legal transition is `Available` → `Consumed`, performed
/// exactly once by [`Storage::allocate_key`]. Nothing reverts a consumed
/// key: even if its paired object is later deleted, the key stays burned
/// (reuse would link submissions and break forward secrecy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    /// Uploaded and not yet handed to any submission.
    Available,
    /// Handed to exactly one submission; never usable again.
    Consumed,
}

/// One public key as stored in the relay's ledger.
///
/// The relay only ever sees the public half; private key material lives
/// exclusively in the recipient's vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    /// PEM-encoded public half.
    pub public_key_pem: String,
    /// Current lifecycle state.
    pub status: KeyStatus,
}

/// The allocator's return value: one key, durably consumed.
///
/// By the time a caller holds this value, the ledger row is already
/// `Consumed` — no caller ever observes a half-allocated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedKey {
    /// Id of the allocated key pair.
    pub id: KeyId,
    /// PEM-encoded public half, ready for wrapping.
    pub public_key_pem: String,
}

/// Record of one encrypted object.
///
/// Ciphertext bytes live in the object store on disk; this record carries
/// everything else, including the wrapped content key and the id of the
/// key pair that wrapped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Unique object id.
    pub id: ObjectId,
    /// Original file name as submitted.
    pub file_name: String,
    /// Declared content type of the original.
    pub content_type: String,
    /// Opaque reference to the owning submitter.
    pub submitter: String,
    /// Final on-disk path of the ciphertext (after collision suffixing).
    pub path: PathBuf,
    /// AEAD nonce the content was encrypted under.
    pub nonce: [u8; NONCE_LEN],
    /// OAEP ciphertext of the content key.
    pub wrapped_key: Vec<u8>,
    /// Key pair whose public half produced `wrapped_key`.
    pub key_id: KeyId,
    /// Creation time, unix seconds.
    pub created_at_secs: u64,
}

/// Storage abstraction for the key ledger and object records.
///
/// Must be Clone (handed to multiple services), Send + Sync (concurrent
/// submissions), and synchronous. Implementations typically share internal
/// state via Arc, so clones access the same underlying storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Insert an uploaded public key as `Available`.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the id is already present (whatever its status).
    fn insert_public_key(&self, id: KeyId, public_key_pem: &str) -> Result<(), StorageError>;

    /// Allocate one available key: pick an `Available` row, mark it
    /// `Consumed`, return it.
    ///
    /// The read-then-mark sequence is a single atomic unit: under N
    /// concurrent callers each success returns a distinct id, and the
    /// `Consumed` status is durable before the key is returned.
    ///
    /// Returns `Ok(None)` when the pool has no available keys, with no
    /// ledger mutation.
    fn allocate_key(&self) -> Result<Option<AllocatedKey>, StorageError>;

    /// Status of a key, `None` if the id is unknown.
    fn key_status(&self, id: KeyId) -> Result<Option<KeyStatus>, StorageError>;

    /// Number of `Available` keys in the pool.
    fn available_key_count(&self) -> Result<usize, StorageError>;

    /// Number of `Consumed` keys in the pool.
    fn consumed_key_count(&self) -> Result<usize, StorageError>;

    /// Persist one object record.
    ///
    /// # Errors
    ///
    /// `DuplicateObject` if the id is already present.
    fn store_object(&self, object: &StoredObject) -> Result<(), StorageError>;

    /// Load one object record by id.
    fn load_object(&self, id: ObjectId) -> Result<Option<StoredObject>, StorageError>;

    /// All object records with `created_at_secs` strictly greater than
    /// `since_secs`, oldest first.
    fn load_objects_since(&self, since_secs: u64) -> Result<Vec<StoredObject>, StorageError>;

    /// Total number of stored object records.
    fn object_count(&self) -> Result<usize, StorageError>;
}
