//! Errors from parsing transfer-bundle material.

use thiserror::Error;

use crate::{NONCE_LEN, ParseIdError};

/// Errors from parsing a key-info record or a bundle file name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// The record ended before the named field.
    #[error("key-info record is missing the `{label}` field")]
    MissingField {
        /// Label of the absent field.
        label: &'static str,
    },

    /// A line was present but carried the wrong label.
    #[error("expected `{label}` field, found {found:?}")]
    WrongLabel {
        /// Label that was required at this position.
        label: &'static str,
        /// The line actually found (truncated by the caller's input).
        found: String,
    },

    /// A binary field failed base64 decoding.
    #[error("field `{label}` is not valid base64")]
    InvalidBase64 {
        /// Label of the undecodable field.
        label: &'static str,
    },

    /// The nonce decoded to the wrong number of bytes.
    #[error("nonce must be {expected} bytes, got {got}")]
    NonceLength {
        /// Required nonce length ([`NONCE_LEN`]).
        expected: usize,
        /// Decoded length.
        got: usize,
    },

    /// The key id failed to parse.
    #[error("invalid key id: {0}")]
    InvalidKeyId(#[from] ParseIdError),
}

impl BundleError {
    /// Canonical nonce-length error for a decoded slice.
    pub(crate) fn nonce_length(got: usize) -> Self {
        Self::NonceLength { expected: NONCE_LEN, got }
    }
}
