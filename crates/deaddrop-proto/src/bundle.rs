//! File-naming rules inside a transfer bundle.
//!
//! A bundle pairs every ciphertext with its key-info record by name:
//!
//! ```text
//! {object_id}_{original_filename}    # ciphertext
//! {object_id}_key_info.txt           # three-field key-info record
//! ```
//!
//! A ciphertext whose key-info file is absent is skipped by batch
//! consumers, not treated as fatal.

use crate::ObjectId;

/// Suffix that marks a key-info file.
pub const KEY_INFO_SUFFIX: &str = "_key_info.txt";

/// Bundle name for an object's ciphertext.
pub fn object_file_name(id: ObjectId, original_file_name: &str) -> String {
    format!("{id}_{original_file_name}")
}

/// Bundle name for an object's key-info record.
pub fn key_info_file_name(id: ObjectId) -> String {
    format!("{id}{KEY_INFO_SUFFIX}")
}

/// Whether a bundle file name is a key-info record (as opposed to a
/// ciphertext).
pub fn is_key_info_file(name: &str) -> bool {
    name.ends_with(KEY_INFO_SUFFIX)
}

/// Split a ciphertext bundle name back into `(object id, original name)`.
///
/// Returns `None` when the name has no id prefix; batch consumers skip such
/// files.
pub fn parse_object_file_name(name: &str) -> Option<(ObjectId, &str)> {
    let (id_part, original) = name.split_once('_')?;
    let id: ObjectId = id_part.parse().ok()?;
    Some((id, original))
}
