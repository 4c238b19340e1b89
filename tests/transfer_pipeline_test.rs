//! Transfer pipeline behavior across many files and injected failures.

mod common;

use std::sync::Arc;

use common::{partner_settings, zip_archive, CountingBlobStore, ENVIRONMENT, ZIP_PASSWORD};
use sftp_ingestion::archive::ArchiveExtractor;
use sftp_ingestion::secrets::{InMemorySecretStore, PartnerSecretNames};
use sftp_ingestion::sftp::{FileTransferError, InMemoryRemoteFileServer, TransferError, TransferPipeline};

const PARTNER: &str = "flexion";

fn secrets() -> Arc<InMemorySecretStore> {
    Arc::new(
        InMemorySecretStore::new()
            .with_secret("flexion-sftp-starting-directory-local", "/home/flexion/outbox")
            .with_secret("flexion-zip-password-local", ZIP_PASSWORD),
    )
}

fn pipeline(
    server: Arc<InMemoryRemoteFileServer>,
    store: Arc<CountingBlobStore>,
    secrets: Arc<InMemorySecretStore>,
) -> TransferPipeline {
    let names = PartnerSecretNames::new(PARTNER, ENVIRONMENT);
    let password_secret = partner_settings(true)
        .has_zip_password
        .then(|| names.zip_password());
    let extractor = Arc::new(ArchiveExtractor::new(
        store.clone(),
        secrets.clone(),
        password_secret,
    ));
    TransferPipeline::new(server, store, secrets, extractor, names)
}

#[tokio::test]
async fn test_every_file_is_attempted_and_only_uploaded_files_are_removed() {
    for file_count in [1usize, 3, 8, 20] {
        let server = Arc::new(InMemoryRemoteFileServer::new());
        let store = Arc::new(CountingBlobStore::new());
        for i in 0..file_count {
            server.add_file(format!("/home/flexion/outbox/msg{i}.hl7"), format!("MSH|{i}"));
            if i % 3 == 0 {
                store.fail_upload_of(format!("import/msg{i}.hl7"));
            }
        }
        let failing = (0..file_count).filter(|i| i % 3 == 0).count();

        let report = pipeline(server.clone(), store.clone(), secrets())
            .copy_files()
            .await
            .unwrap();

        assert_eq!(store.upload_attempts(), file_count);
        assert_eq!(server.read_calls(), file_count);
        assert_eq!(server.remove_calls(), file_count - failing);
        assert_eq!(report.copied_count(), file_count - failing);
        assert_eq!(report.failure_count(), failing);
        assert!(report
            .failures()
            .all(|(_, e)| matches!(e, FileTransferError::Upload { .. })));

        // Files whose upload failed stay on the server for the next pass
        assert_eq!(server.file_paths().len(), failing);
    }
}

#[tokio::test]
async fn test_archive_is_staged_extracted_and_removed() {
    let server = Arc::new(InMemoryRemoteFileServer::new());
    server.add_file(
        "/home/flexion/outbox/batch.zip",
        zip_archive(&[
            ("a.hl7", b"MSH|a", Some(ZIP_PASSWORD)),
            ("b.hl7", b"MSH|b", Some(ZIP_PASSWORD)),
        ]),
    );
    server.add_file("/home/flexion/outbox/c.hl7", b"MSH|c".to_vec());
    let store = Arc::new(CountingBlobStore::new());

    let report = pipeline(server.clone(), store.clone(), secrets())
        .copy_files()
        .await
        .unwrap();

    assert_eq!(report.copied_count(), 2);
    assert_eq!(
        store.paths(),
        vec![
            "import/a.hl7",
            "import/b.hl7",
            "import/c.hl7",
            "unzip/success/batch.zip"
        ]
    );
    let archive = report
        .copied()
        .find(|copied| copied.blob_path == "unzip/batch.zip")
        .and_then(|copied| copied.archive.clone())
        .unwrap()
        .unwrap();
    assert_eq!(archive.uploaded.len(), 2);
    assert!(server.file_paths().is_empty());
}

#[tokio::test]
async fn test_unreadable_archive_is_still_removed_and_moved_to_failure() {
    let server = Arc::new(InMemoryRemoteFileServer::new());
    server.add_file("/home/flexion/outbox/broken.zip", b"not a zip".to_vec());
    let store = Arc::new(CountingBlobStore::new());

    let report = pipeline(server.clone(), store.clone(), secrets())
        .copy_files()
        .await
        .unwrap();

    let copied: Vec<_> = report.copied().collect();
    assert_eq!(copied.len(), 1);
    assert!(matches!(copied[0].archive, Some(Err(_))));
    assert_eq!(store.paths(), vec!["unzip/failure/broken.zip"]);
    assert!(server.file_paths().is_empty());
}

#[tokio::test]
async fn test_missing_starting_directory_fails_the_pass() {
    let server = Arc::new(InMemoryRemoteFileServer::new());
    server.add_file("/home/flexion/outbox/a.hl7", b"MSH|a".to_vec());
    let store = Arc::new(CountingBlobStore::new());

    let result = pipeline(server.clone(), store.clone(), Arc::new(InMemorySecretStore::new()))
        .copy_files()
        .await;

    assert!(matches!(result, Err(TransferError::Secret { .. })));
    assert_eq!(server.read_calls(), 0);
    assert_eq!(store.upload_attempts(), 0);
}

#[tokio::test]
async fn test_second_pass_only_touches_remaining_files() {
    let server = Arc::new(InMemoryRemoteFileServer::new());
    server.add_file("/home/flexion/outbox/a.hl7", b"MSH|a".to_vec());
    server.add_file("/home/flexion/outbox/b.hl7", b"MSH|b".to_vec());
    server.fail_remove_of("/home/flexion/outbox/b.hl7");
    let store = Arc::new(CountingBlobStore::new());
    let pipeline = pipeline(server.clone(), store.clone(), secrets());

    let first = pipeline.copy_files().await.unwrap();
    assert_eq!(first.copied_count(), 1);
    assert_eq!(server.file_paths(), vec!["/home/flexion/outbox/b.hl7"]);

    let second = pipeline.copy_files().await.unwrap();
    assert_eq!(second.files.len(), 1);
    assert_eq!(second.files[0].file_name, "b.hl7");
    assert_eq!(store.upload_attempts(), 3);
}
