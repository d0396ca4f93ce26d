//! Public-key intake: how recipient-generated keys enter the pool.
//!
//! The provisioning side uploads one PEM public half per key id. Keys are
//! validated before they are inserted — a malformed or undersized key in
//! the pool would only be discovered mid-submission, after a content key
//! was already generated.

use deaddrop_proto::KeyId;
use thiserror::Error;
use tracing::info;

use crate::storage::{Storage, StorageError};

/// Content types accepted for a public key upload. Anything else is
/// rejected before the body is looked at.
pub const PEM_CONTENT_TYPES: &[&str] = &[
    "application/x-pem-file",
    "application/x-x509-ca-cert",
    "text/plain",
    "application/pkcs10",
];

/// Errors from public-key intake.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Upload declared a non-PEM content type.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Body is not UTF-8, so it cannot be PEM.
    #[error("public key body is not valid UTF-8")]
    NotUtf8,

    /// Body did not parse as an acceptable RSA public key.
    #[error("rejected public key: {0}")]
    InvalidKey(String),

    /// Ledger fault (including duplicate id).
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Validate and insert one uploaded public key as `Available`.
///
/// # Errors
///
/// See [`IntakeError`]; on any error nothing is inserted.
pub fn intake_public_key<S: Storage>(
    storage: &S,
    id: KeyId,
    body: &[u8],
    content_type: &str,
) -> Result<(), IntakeError> {
    if !PEM_CONTENT_TYPES.contains(&content_type) {
        return Err(IntakeError::UnsupportedContentType(content_type.to_string()));
    }

    let pem = std::str::from_utf8(body).map_err(|_| IntakeError::NotUtf8)?;

    deaddrop_crypto::parse_public_key_pem(pem)
        .map_err(|e| IntakeError::InvalidKey(e.to_string()))?;

    storage.insert_public_key(id, pem)?;
    info!(key_id = %id, "public key added to pool");

    Ok(())
}
