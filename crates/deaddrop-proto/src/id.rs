//! Stable 128-bit identifiers for key pairs and stored objects.
//!
//! Ids are opaque random values. On the wire (and in bundle file names) they
//! appear as 32-character lower-case hex with no separators, so they survive
//! being embedded in file names on every filesystem we care about.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of bytes in an identifier (128 bits).
pub const ID_SIZE: usize = 16;

/// Hex characters in the rendered form of an id.
const HEX_LEN: usize = ID_SIZE * 2;

/// Errors from parsing the hex form of an id.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseIdError {
    /// Input length doesn't match the 32-character hex form.
    #[error("expected {expected} hex characters, got {got}")]
    Length {
        /// Required number of characters.
        expected: usize,
        /// Number of characters in the input.
        got: usize,
    },

    /// Input contains a character outside `[0-9a-fA-F]`.
    #[error("invalid hex digit at position {position}")]
    InvalidDigit {
        /// Byte offset of the offending character.
        position: usize,
    },
}

fn hex_digit(c: u8, position: usize) -> Result<u8, ParseIdError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(ParseIdError::InvalidDigit { position }),
    }
}

fn parse_hex(s: &str) -> Result<[u8; ID_SIZE], ParseIdError> {
    let raw = s.as_bytes();
    if raw.len() != HEX_LEN {
        return Err(ParseIdError::Length { expected: HEX_LEN, got: raw.len() });
    }

    let mut bytes = [0u8; ID_SIZE];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let hi = hex_digit(raw[i * 2], i * 2)?;
        let lo = hex_digit(raw[i * 2 + 1], i * 2 + 1)?;
        *byte = (hi << 4) | lo;
    }

    Ok(bytes)
}

fn write_hex(bytes: &[u8; ID_SIZE], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:032x}", u128::from_be_bytes(*bytes))
}

/// Identifier of one RSA key pair.
///
/// Assigned by the recipient at generation time and referenced by every
/// record that names the key: the server-side ledger row, the wrapped
/// content key, and the key-info record in a transfer bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId([u8; ID_SIZE]);

impl KeyId {
    /// Build an id from raw bytes (caller supplies the randomness).
    pub fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw big-endian bytes, suitable as a fixed-width storage key.
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(&self.0, f)
    }
}

impl FromStr for KeyId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex(s).map(Self)
    }
}

/// Identifier of one encrypted object stored on the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; ID_SIZE]);

impl ObjectId {
    /// Build an id from raw bytes (caller supplies the randomness).
    pub fn from_bytes(bytes: [u8; ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw big-endian bytes, suitable as a fixed-width storage key.
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(&self.0, f)
    }
}

impl FromStr for ObjectId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let id = KeyId::from_bytes([
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
            0x0F, 0x10,
        ]);

        let rendered = id.to_string();
        assert_eq!(rendered, "0102030405060708090a0b0c0d0e0f10");
        assert_eq!(rendered.parse::<KeyId>().unwrap(), id);
    }

    #[test]
    fn leading_zeros_preserved() {
        let id = ObjectId::from_bytes([0u8; ID_SIZE]);
        assert_eq!(id.to_string().len(), 32);
        assert_eq!(id.to_string().parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "abc".parse::<KeyId>().unwrap_err();
        assert_eq!(err, ParseIdError::Length { expected: 32, got: 3 });
    }

    #[test]
    fn rejects_non_hex() {
        let input = "zz02030405060708090a0b0c0d0e0f10";
        let err = input.parse::<KeyId>().unwrap_err();
        assert_eq!(err, ParseIdError::InvalidDigit { position: 0 });
    }

    #[test]
    fn uppercase_hex_accepted() {
        let id: KeyId = "0102030405060708090A0B0C0D0E0F10".parse().unwrap();
        assert_eq!(id.to_string(), "0102030405060708090a0b0c0d0e0f10");
    }
}
