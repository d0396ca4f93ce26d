//! Full protocol loop: offline keygen → public-half upload → anonymous
//! submission → bundle export → batch decryption.
//!
//! The relay and the recipient share nothing but the intake call and the
//! bundle directory, exactly as in deployment.

use std::fs;

use deaddrop_client::{
    BatchSummary, DecryptError, KeyVault, confirm_uploaded, decrypt_directory, decrypt_object,
    export_pending, provision_keypairs,
};
use deaddrop_proto::{KeyId, KeyInfoRecord, bundle};
use deaddrop_server::{
    ObjectStore, RedbStorage, RetrievalService, Storage, SubmissionRequest, SubmissionService,
    intake_public_key,
};
use tempfile::tempdir;

const KEY_BITS: usize = 2048;

struct Loop {
    vault: KeyVault,
    storage: RedbStorage,
    submission: SubmissionService<RedbStorage>,
    retrieval: RetrievalService<RedbStorage>,
}

/// Provision `keys` pairs locally and upload every public half.
fn set_up(dir: &std::path::Path, keys: usize) -> Loop {
    let vault = KeyVault::open(dir.join("vault.redb")).unwrap();
    provision_keypairs(&vault, keys, KEY_BITS).unwrap();

    let storage = RedbStorage::open(dir.join("relay.redb")).unwrap();

    let exports = export_pending(&vault).unwrap();
    assert_eq!(exports.len(), keys);
    for export in &exports {
        intake_public_key(&storage, export.id, export.public_key_pem.as_bytes(), export.content_type)
            .unwrap();
    }
    confirm_uploaded(&vault, &exports.iter().map(|e| e.id).collect::<Vec<_>>()).unwrap();

    Loop {
        vault,
        storage: storage.clone(),
        submission: SubmissionService::new(storage.clone(), ObjectStore::new(dir.join("objects"))),
        retrieval: RetrievalService::new(storage),
    }
}

fn request(file_name: &str, plaintext: &[u8]) -> SubmissionRequest {
    SubmissionRequest {
        file_name: file_name.to_string(),
        content_type: "application/pdf".to_string(),
        submitter: "anonymous".to_string(),
        plaintext: plaintext.to_vec(),
    }
}

#[test]
fn round_trip_through_the_bundle_directory() {
    let dir = tempdir().unwrap();
    let harness = set_up(dir.path(), 3);

    let alpha = b"alpha document".to_vec();
    let beta = vec![0x5Au8; 512 * 1024];
    let empty = Vec::new();

    harness.submission.submit(request("alpha.pdf", &alpha)).unwrap();
    harness.submission.submit(request("beta.pdf", &beta)).unwrap();
    harness.submission.submit(request("empty.pdf", &empty)).unwrap();

    let bundle_dir = dir.path().join("downloads");
    assert_eq!(harness.retrieval.export_to_dir(0, &bundle_dir).unwrap(), 3);

    let out_dir = dir.path().join("decrypted");
    let summary = decrypt_directory(&harness.vault, &bundle_dir, &out_dir).unwrap();
    assert_eq!(summary, BatchSummary { succeeded: 3, failed: 0 });

    assert_eq!(fs::read(out_dir.join("alpha.pdf")).unwrap(), alpha);
    assert_eq!(fs::read(out_dir.join("beta.pdf")).unwrap(), beta);
    assert_eq!(fs::read(out_dir.join("empty.pdf")).unwrap(), empty);

    // All three keys burned, none left.
    assert_eq!(harness.storage.available_key_count().unwrap(), 0);
    assert_eq!(harness.storage.consumed_key_count().unwrap(), 3);
}

#[test]
fn tampered_object_fails_alone_and_batch_continues() {
    let dir = tempdir().unwrap();
    let harness = set_up(dir.path(), 2);

    harness.submission.submit(request("good.pdf", b"good content")).unwrap();
    harness.submission.submit(request("bad.pdf", b"doomed content")).unwrap();

    let bundle_dir = dir.path().join("downloads");
    harness.retrieval.export_to_dir(0, &bundle_dir).unwrap();

    // Flip one bit in the ciphertext of bad.pdf.
    let victim = fs::read_dir(&bundle_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.to_string_lossy().ends_with("_bad.pdf"))
        .unwrap();
    let mut bytes = fs::read(&victim).unwrap();
    bytes[0] ^= 0x01;
    fs::write(&victim, bytes).unwrap();

    let out_dir = dir.path().join("decrypted");
    let summary = decrypt_directory(&harness.vault, &bundle_dir, &out_dir).unwrap();

    assert_eq!(summary, BatchSummary { succeeded: 1, failed: 1 });
    assert_eq!(fs::read(out_dir.join("good.pdf")).unwrap(), b"good content");
    // The tampered object produced no output at all.
    assert!(!out_dir.join("bad.pdf").exists());
}

#[test]
fn missing_key_info_is_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let harness = set_up(dir.path(), 2);

    harness.submission.submit(request("kept.pdf", b"kept")).unwrap();
    harness.submission.submit(request("orphan.pdf", b"orphan")).unwrap();

    let bundle_dir = dir.path().join("downloads");
    harness.retrieval.export_to_dir(0, &bundle_dir).unwrap();

    // Drop the key-info partner of orphan.pdf.
    let orphan_ciphertext = fs::read_dir(&bundle_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .find(|n| n.ends_with("_orphan.pdf"))
        .unwrap();
    let (orphan_id, _) = bundle::parse_object_file_name(&orphan_ciphertext).unwrap();
    fs::remove_file(bundle_dir.join(bundle::key_info_file_name(orphan_id))).unwrap();

    let summary =
        decrypt_directory(&harness.vault, &bundle_dir, &dir.path().join("decrypted")).unwrap();

    assert_eq!(summary, BatchSummary { succeeded: 1, failed: 1 });
}

#[test]
fn foreign_key_id_reports_key_not_found() {
    let dir = tempdir().unwrap();
    let harness = set_up(dir.path(), 1);

    harness.submission.submit(request("doc.pdf", b"content")).unwrap();

    let objects = harness.retrieval.fetch_since(0).unwrap();
    let object = &objects[0];

    // A record naming a key this vault never generated: recoverable
    // not-found, distinct from an unwrap failure.
    let foreign = KeyInfoRecord {
        wrapped_key: object.key_info.wrapped_key.clone(),
        nonce: object.key_info.nonce,
        key_id: KeyId::from_bytes([0xEE; 16]),
    };

    let result = decrypt_object(&harness.vault, &foreign, &object.ciphertext);
    assert!(matches!(result, Err(DecryptError::KeyNotFound(_))));
}

#[test]
fn wrong_vault_key_reports_unwrap_failure() {
    let dir = tempdir().unwrap();
    let harness = set_up(dir.path(), 1);

    harness.submission.submit(request("doc.pdf", b"content")).unwrap();
    let objects = harness.retrieval.fetch_since(0).unwrap();
    let object = &objects[0];

    // A second vault with its own pair under the same id: lookup succeeds,
    // unwrap must fail — wrong plaintext is never an outcome.
    let other_vault = KeyVault::open(dir.path().join("other-vault.redb")).unwrap();
    let other_id = provision_keypairs(&other_vault, 1, KEY_BITS).unwrap()[0];

    let mismatched = KeyInfoRecord {
        wrapped_key: object.key_info.wrapped_key.clone(),
        nonce: object.key_info.nonce,
        key_id: other_id,
    };

    let result = decrypt_object(&other_vault, &mismatched, &object.ciphertext);
    assert!(matches!(result, Err(DecryptError::UnwrapFailure { .. })));
}

#[test]
fn uploaded_flag_keeps_reexports_empty() {
    let dir = tempdir().unwrap();
    let harness = set_up(dir.path(), 2);

    // set_up confirmed all uploads; nothing is pending anymore.
    assert!(export_pending(&harness.vault).unwrap().is_empty());
    assert_eq!(harness.vault.key_count().unwrap(), 2);
}
