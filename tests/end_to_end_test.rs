//! Full message flows: queue -> consumer -> handler -> storage/forwarder.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{partner_settings, storage_event, zip_archive, ENVIRONMENT, ZIP_PASSWORD};
use sftp_ingestion::config::{PartnerConfigs, TextEncoding};
use sftp_ingestion::messaging::{InMemoryQueueService, MessageTtl, QueueService};
use sftp_ingestion::orchestration::{
    ImportMessageHandler, MessageContentHandler, MessageOutcome, PollingMessageHandler,
    QueueConsumer, QueueConsumerConfig,
};
use sftp_ingestion::report_stream::InMemoryReportSender;
use sftp_ingestion::secrets::InMemorySecretStore;
use sftp_ingestion::sftp::{InMemoryRemoteConnector, InMemoryRemoteFileServer};
use sftp_ingestion::storage::InMemoryBlobStore;
use sftp_ingestion::usecases::ReadAndSend;

fn consumer_config() -> QueueConsumerConfig {
    QueueConsumerConfig {
        batch_size: 10,
        visibility_timeout: Duration::from_secs(900),
        poll_interval: Duration::from_millis(10),
        max_delivery_attempts: 5,
    }
}

struct ImportFixture {
    queue: Arc<InMemoryQueueService>,
    store: Arc<InMemoryBlobStore>,
    sender: Arc<InMemoryReportSender>,
    consumer: QueueConsumer,
}

fn import_fixture() -> ImportFixture {
    let queue = Arc::new(InMemoryQueueService::new("import"));
    let dead_letter = Arc::new(InMemoryQueueService::new("import-dead-letter"));
    let store = Arc::new(InMemoryBlobStore::new());
    let sender = Arc::new(InMemoryReportSender::new());
    let use_case = Arc::new(ReadAndSend::new(
        store.clone(),
        sender.clone(),
        TextEncoding::Utf8,
    ));
    let handler: Arc<dyn MessageContentHandler> = Arc::new(ImportMessageHandler::new(use_case));
    let consumer = QueueConsumer::new(queue.clone(), dead_letter, handler, consumer_config());
    ImportFixture {
        queue,
        store,
        sender,
        consumer,
    }
}

#[tokio::test]
async fn test_notification_is_forwarded_and_deleted() {
    let f = import_fixture();
    f.store
        .insert("customer/import/msg2.hl7", b"MSH|^~\\&|msg2".to_vec());
    f.queue
        .enqueue(
            &storage_event("https://host/container/customer/import/msg2.hl7", None),
            MessageTtl::Infinite,
        )
        .await
        .unwrap();

    let reports = f.consumer.process_batch().await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].result, Ok(MessageOutcome::Deleted));
    assert_eq!(f.sender.sent(), vec![b"MSH|^~\\&|msg2".to_vec()]);
    assert_eq!(f.queue.queue_length(), 0);
    assert_eq!(f.store.paths(), vec!["customer/success/msg2.hl7"]);
}

#[tokio::test]
async fn test_notification_for_encoded_file_name_is_forwarded() {
    let f = import_fixture();
    f.store
        .insert("customer/import/lab report.hl7", b"MSH|lab".to_vec());
    f.queue
        .enqueue(
            &storage_event(
                "https://host/container/customer/import/lab%20report.hl7",
                None,
            ),
            MessageTtl::Infinite,
        )
        .await
        .unwrap();

    let reports = f.consumer.process_batch().await.unwrap();

    assert_eq!(reports[0].result, Ok(MessageOutcome::Deleted));
    assert_eq!(f.sender.sent(), vec![b"MSH|lab".to_vec()]);
    assert_eq!(f.store.paths(), vec!["customer/success/lab report.hl7"]);
}

#[tokio::test]
async fn test_malformed_subject_is_not_forwarded() {
    for subject in [
        "/blobServices/default/containers/sftp/customer/import/msg2.hl7",
        "/blobServices/default/containers/sftp/blobs/customer/blobs/import/msg2.hl7",
    ] {
        let f = import_fixture();
        f.store
            .insert("customer/import/msg2.hl7", b"MSH|msg2".to_vec());
        f.queue
            .enqueue(
                &storage_event(
                    "https://host/container/customer/import/msg2.hl7",
                    Some(subject),
                ),
                MessageTtl::Infinite,
            )
            .await
            .unwrap();

        let reports = f.consumer.process_batch().await.unwrap();

        assert!(matches!(
            reports[0].result,
            Ok(MessageOutcome::LeftForRedelivery { .. })
        ));
        assert_eq!(f.sender.sent_count(), 0);
        assert_eq!(f.queue.queue_length(), 1);
        assert_eq!(f.store.paths(), vec!["customer/import/msg2.hl7"]);
    }
}

#[tokio::test]
async fn test_polled_archive_with_corrupt_member() {
    let server = Arc::new(InMemoryRemoteFileServer::new());
    server.add_file(
        "outbox/report.zip",
        zip_archive(&[
            ("corrupt.hl7", b"MSH|corrupt", Some("not-the-password")),
            ("a.hl7", b"MSH|a", Some(ZIP_PASSWORD)),
        ]),
    );
    let secrets = Arc::new(
        InMemorySecretStore::new()
            .with_secret("flexion-sftp-starting-directory-local", "outbox")
            .with_secret("flexion-zip-password-local", ZIP_PASSWORD),
    );
    let store = Arc::new(InMemoryBlobStore::new());
    let partners = PartnerConfigs::new().with_partner("flexion", partner_settings(true));
    let handler: Arc<dyn MessageContentHandler> = Arc::new(PollingMessageHandler::new(
        Arc::new(partners),
        Arc::new(InMemoryRemoteConnector::new(server.clone())),
        store.clone(),
        secrets,
        ENVIRONMENT,
    ));
    let queue = Arc::new(InMemoryQueueService::new("polling"));
    let dead_letter = Arc::new(InMemoryQueueService::new("polling-dead-letter"));
    let consumer = QueueConsumer::new(queue.clone(), dead_letter, handler, consumer_config());
    queue.enqueue("flexion", MessageTtl::Infinite).await.unwrap();

    let reports = consumer.process_batch().await.unwrap();

    assert_eq!(reports[0].result, Ok(MessageOutcome::Deleted));
    assert_eq!(store.get("import/a.hl7").unwrap(), b"MSH|a");
    let ledger = String::from_utf8(store.get("failure/report.zip.txt").unwrap()).unwrap();
    assert_eq!(ledger.lines().count(), 1);
    assert!(ledger.starts_with("corrupt.hl7: "));
    assert!(store.get("unzip/success/report.zip").is_some());
    assert!(server.file_paths().is_empty());
    assert!(server.is_closed());
}
