//! The envelope decryptor.
//!
//! Single-object decryption reverses the envelope exactly: look up the
//! private half by key id, OAEP-unwrap the content key, AEAD-decrypt the
//! ciphertext. Batch decryption walks a bundle directory and keeps going
//! past individual failures, accumulating counts — one corrupt object
//! must not block the rest of a fetch.
//!
//! Failure logging is deliberately two-tier: a missing private key is the
//! normal state of incremental sync (`info`), while an unwrap failure or
//! a bad authentication tag means tampering, corruption, or a wrong key
//! and is logged as a warning. Neither ever surfaces partial plaintext.

use std::{fs, path::Path};

use deaddrop_crypto::{EnvelopeError, decrypt_content, parse_private_key_pem, unwrap_content_key};
use deaddrop_proto::{KeyId, KeyInfoRecord, bundle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::vault::{KeyVault, VaultError};

/// Errors from decrypting one object.
#[derive(Debug, Error)]
pub enum DecryptError {
    /// No private key for the referenced id in the local vault. Expected
    /// during incremental sync; recoverable once the matching pair exists
    /// locally.
    #[error("no private key for id {0}")]
    KeyNotFound(KeyId),

    /// OAEP unwrap failed or recovered the wrong length: wrong key or
    /// corrupted wrapped data. Never retried with the same inputs.
    #[error("content key unwrap failed: {reason}")]
    UnwrapFailure {
        /// Underlying failure detail.
        reason: String,
    },

    /// Authentication tag mismatch: tamper or corruption.
    #[error("authentication tag invalid")]
    AuthTagInvalid,

    /// Vault fault.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Batch-level I/O fault (directory listing, output writing).
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DecryptError {
    fn from(err: std::io::Error) -> Self {
        DecryptError::Io(err.to_string())
    }
}

fn map_envelope(err: EnvelopeError) -> DecryptError {
    match err {
        EnvelopeError::AuthTagInvalid => DecryptError::AuthTagInvalid,
        other => DecryptError::UnwrapFailure { reason: other.to_string() },
    }
}

/// Decrypt one object against the vault.
///
/// Returns plaintext byte-identical to what was submitted, for any length
/// including zero.
///
/// # Errors
///
/// See [`DecryptError`]; on any error no plaintext (partial or otherwise)
/// is returned.
pub fn decrypt_object(
    vault: &KeyVault,
    key_info: &KeyInfoRecord,
    ciphertext: &[u8],
) -> Result<Vec<u8>, DecryptError> {
    let private_pem = vault
        .private_key_pem(key_info.key_id)?
        .ok_or(DecryptError::KeyNotFound(key_info.key_id))?;

    let private_key = parse_private_key_pem(&private_pem).map_err(map_envelope)?;
    let content_key = unwrap_content_key(&key_info.wrapped_key, &private_key).map_err(map_envelope)?;

    decrypt_content(ciphertext, &content_key, &key_info.nonce).map_err(map_envelope)
}

/// Outcome of a batch decryption run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Objects decrypted and written out.
    pub succeeded: usize,
    /// Objects skipped or failed (missing key info, unreadable,
    /// undecryptable).
    pub failed: usize,
}

/// Decrypt every object in a bundle directory into `output_dir`.
///
/// Ciphertext files are paired with their `{id}_key_info.txt` records by
/// name; plaintext is written under the original file name. The batch
/// continues past per-object failures.
///
/// # Errors
///
/// Only directory-level I/O is fatal (unreadable input dir, uncreatable
/// output dir); everything per-object is counted in the summary.
pub fn decrypt_directory(
    vault: &KeyVault,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<BatchSummary, DecryptError> {
    fs::create_dir_all(output_dir)?;

    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut summary = BatchSummary::default();

    for name in names.iter().filter(|n| !bundle::is_key_info_file(n)) {
        if decrypt_one_entry(vault, input_dir, output_dir, name) {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }
    }

    info!(succeeded = summary.succeeded, failed = summary.failed, "batch decryption finished");
    Ok(summary)
}

/// Decrypt a single bundle entry; false means skipped or failed.
fn decrypt_one_entry(
    vault: &KeyVault,
    input_dir: &Path,
    output_dir: &Path,
    name: &str,
) -> bool {
    let Some((object_id, original_name)) = bundle::parse_object_file_name(name) else {
        warn!(file = name, "no object id prefix; skipping");
        return false;
    };

    let key_info_path = input_dir.join(bundle::key_info_file_name(object_id));
    let key_info_text = match fs::read_to_string(&key_info_path) {
        Ok(text) => text,
        Err(err) => {
            warn!(file = name, %err, "key info missing; skipping");
            return false;
        },
    };

    let key_info = match KeyInfoRecord::parse(&key_info_text) {
        Ok(record) => record,
        Err(err) => {
            warn!(file = name, %err, "malformed key info; skipping");
            return false;
        },
    };

    let ciphertext = match fs::read(input_dir.join(name)) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(file = name, %err, "unreadable ciphertext; skipping");
            return false;
        },
    };

    let plaintext = match decrypt_object(vault, &key_info, &ciphertext) {
        Ok(plaintext) => plaintext,
        Err(err @ DecryptError::KeyNotFound(_)) => {
            info!(file = name, %err, "private half not local yet");
            return false;
        },
        Err(err) => {
            warn!(file = name, %err, "decryption failed");
            return false;
        },
    };

    let output_path = output_dir.join(original_name);
    if let Err(err) = fs::write(&output_path, plaintext) {
        warn!(file = name, %err, "could not write plaintext");
        return false;
    }

    debug!(file = name, output = %output_path.display(), "object decrypted");
    true
}
