//! The three-field key-info record carried beside each ciphertext.
//!
//! ```text
//! Encrypted Key: <base64 OAEP ciphertext>
//! Nonce: <base64 12-byte AEAD nonce>
//! Public Key ID: <32-char hex id>
//! ```
//!
//! The record is fixed: exactly these three fields, in this order, each on
//! its own line with a verified label. Parsing checks labels rather than
//! stripping lines by position, so a reordered or truncated record is
//! rejected instead of silently mis-read.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::{BundleError, KeyId};

/// AEAD nonce length carried by the record (AES-GCM initialization vector).
pub const NONCE_LEN: usize = 12;

const ENCRYPTED_KEY_LABEL: &str = "Encrypted Key: ";
const NONCE_LABEL: &str = "Nonce: ";
const KEY_ID_LABEL: &str = "Public Key ID: ";

/// The wrapped content key and the parameters needed to use it.
///
/// One record references exactly one key pair; the referenced key is
/// `Consumed` on the relay from the moment the record exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfoRecord {
    /// OAEP ciphertext of the 32-byte content key. Length equals the
    /// wrapping key's modulus size in bytes.
    pub wrapped_key: Vec<u8>,
    /// Nonce the content was encrypted under. Fresh per object.
    pub nonce: [u8; NONCE_LEN],
    /// Id of the key pair whose public half produced `wrapped_key`.
    pub key_id: KeyId,
}

impl KeyInfoRecord {
    /// Render the record in its three-line wire form.
    pub fn encode(&self) -> String {
        format!(
            "{ENCRYPTED_KEY_LABEL}{}\n{NONCE_LABEL}{}\n{KEY_ID_LABEL}{}",
            BASE64.encode(&self.wrapped_key),
            BASE64.encode(self.nonce),
            self.key_id,
        )
    }

    /// Parse the three-line wire form.
    ///
    /// # Errors
    ///
    /// - [`BundleError::MissingField`] / [`BundleError::WrongLabel`] when the
    ///   shape is off
    /// - [`BundleError::InvalidBase64`] / [`BundleError::NonceLength`] /
    ///   [`BundleError::InvalidKeyId`] when a field's value is malformed
    pub fn parse(input: &str) -> Result<Self, BundleError> {
        let mut lines = input.lines();

        let wrapped_key = decode_field(lines.next(), ENCRYPTED_KEY_LABEL)?;
        let nonce_bytes = decode_field(lines.next(), NONCE_LABEL)?;
        let id_value = field_value(lines.next(), KEY_ID_LABEL)?;

        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .as_slice()
            .try_into()
            .map_err(|_| BundleError::nonce_length(nonce_bytes.len()))?;

        let key_id: KeyId = id_value.trim_end().parse()?;

        Ok(Self { wrapped_key, nonce, key_id })
    }
}

/// Extract the value of a labeled line, verifying the label.
fn field_value<'a>(line: Option<&'a str>, label: &'static str) -> Result<&'a str, BundleError> {
    let line = line.ok_or(BundleError::MissingField { label })?;
    line.strip_prefix(label)
        .ok_or_else(|| BundleError::WrongLabel { label, found: line.chars().take(40).collect() })
}

/// Extract and base64-decode the value of a labeled line.
fn decode_field(line: Option<&str>, label: &'static str) -> Result<Vec<u8>, BundleError> {
    let value = field_value(line, label)?;
    BASE64.decode(value.trim_end()).map_err(|_| BundleError::InvalidBase64 { label })
}
