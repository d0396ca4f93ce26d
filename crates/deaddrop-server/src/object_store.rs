//! On-disk storage for ciphertext blobs.
//!
//! Records live in the ledger; the (potentially large) ciphertext bytes
//! live as flat files under one root directory. Stored names drop the
//! original extension and carry an `_encrypted` marker; the blob is not
//! the original format and should not open as one.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Flat-file store for encrypted object bytes.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a store rooted at the given directory. The directory is
    /// created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one ciphertext blob, returning the final path.
    ///
    /// If the target name is taken, an incrementing numeric suffix is
    /// appended before the extension until a free path is found; callers
    /// must record the returned path, not the name they asked for.
    pub fn write(&self, original_file_name: &str, ciphertext: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let path = unique_path(self.root.join(storage_file_name(original_file_name)));
        fs::write(&path, ciphertext)?;

        Ok(path)
    }
}

/// Storage name for an original file name: stem plus `_encrypted`.
fn storage_file_name(original: &str) -> String {
    let stem = original.split('.').next().unwrap_or(original);
    format!("{stem}_encrypted")
}

/// First free variant of `path`, suffixing `_1`, `_2`, ... before the
/// extension.
fn unique_path(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }

    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 1;
    loop {
        let name = match &extension {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
