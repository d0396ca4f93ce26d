//! The upload view of the vault.
//!
//! Serializes public halves for the relay's key-intake interface and
//! records the relay's confirmation. This is the only part of the client
//! that turns vault contents into something that leaves the machine, and
//! it structurally cannot carry a private half: [`PublicKeyExport`] has no
//! field for one.

use deaddrop_proto::KeyId;
use tracing::info;

use crate::vault::{KeyVault, VaultError};

/// Content type declared when uploading a public half.
pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

/// One public key ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyExport {
    /// Id the relay will file the key under.
    pub id: KeyId,
    /// SPKI PEM public half.
    pub public_key_pem: String,
    /// Content type for the upload call.
    pub content_type: &'static str,
}

/// Everything in the vault that hasn't been uploaded yet, as upload-ready
/// exports.
///
/// Calling this does not mark anything uploaded; confirm with
/// [`confirm_uploaded`] once the relay accepted the keys.
pub fn export_pending(vault: &KeyVault) -> Result<Vec<PublicKeyExport>, VaultError> {
    let exports: Vec<PublicKeyExport> = vault
        .pending_upload()?
        .into_iter()
        .map(|(id, public_key_pem)| PublicKeyExport {
            id,
            public_key_pem,
            content_type: PEM_CONTENT_TYPE,
        })
        .collect();

    info!(count = exports.len(), "pending public keys exported");
    Ok(exports)
}

/// Record that the relay accepted these keys.
pub fn confirm_uploaded(vault: &KeyVault, ids: &[KeyId]) -> Result<(), VaultError> {
    vault.mark_uploaded(ids)?;
    info!(count = ids.len(), "uploads confirmed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::vault::LocalKeyPair;

    fn key_id(n: u8) -> KeyId {
        KeyId::from_bytes([n; 16])
    }

    fn vault_with_pairs(dir: &std::path::Path, count: u8) -> KeyVault {
        let vault = KeyVault::open(dir.join("vault.redb")).unwrap();
        for n in 1..=count {
            vault
                .insert(
                    key_id(n),
                    &LocalKeyPair {
                        public_key_pem: format!("public-{n}"),
                        private_key_pem: format!("private-{n}"),
                        uploaded: false,
                    },
                )
                .unwrap();
        }
        vault
    }

    #[test]
    fn export_carries_no_private_material() {
        let dir = tempdir().unwrap();
        let vault = vault_with_pairs(dir.path(), 2);

        let exports = export_pending(&vault).unwrap();

        assert_eq!(exports.len(), 2);
        for export in &exports {
            assert_eq!(export.content_type, "application/x-pem-file");
            assert!(export.public_key_pem.starts_with("public-"));
            assert!(!export.public_key_pem.contains("private"));
        }
    }

    #[test]
    fn confirmed_keys_drop_out_of_the_export() {
        let dir = tempdir().unwrap();
        let vault = vault_with_pairs(dir.path(), 3);

        let first = export_pending(&vault).unwrap();
        let confirmed: Vec<KeyId> = first.iter().take(2).map(|e| e.id).collect();
        confirm_uploaded(&vault, &confirmed).unwrap();

        let remaining = export_pending(&vault).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(!confirmed.contains(&remaining[0].id));
    }

    #[test]
    fn empty_vault_exports_nothing() {
        let dir = tempdir().unwrap();
        let vault = KeyVault::open(dir.path().join("vault.redb")).unwrap();

        assert!(export_pending(&vault).unwrap().is_empty());
    }
}
