//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::{AesMode, ZipWriter};

use sftp_ingestion::config::{PartnerSettings, TextEncoding};
use sftp_ingestion::storage::{BlobStore, InMemoryBlobStore, StorageError, StorageResult};

pub const ENVIRONMENT: &str = "local";
pub const ZIP_PASSWORD: &str = "correct-horse";

pub fn partner_settings(has_zip_password: bool) -> PartnerSettings {
    PartnerSettings {
        display_name: "Flexion".to_string(),
        is_active: true,
        is_external_sftp_connection: false,
        has_zip_password,
        default_encoding: TextEncoding::Utf8,
    }
}

/// Build a zip in memory. Members with a password are AES-256 encrypted.
pub fn zip_archive(members: &[(&str, &[u8], Option<&'static str>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents, password) in members {
        let options = match password {
            Some(password) => {
                SimpleFileOptions::default().with_aes_encryption(AesMode::Aes256, *password)
            }
            None => SimpleFileOptions::default(),
        };
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Base64 storage-change event body as the import queue receives it
pub fn storage_event(url: &str, subject: Option<&str>) -> String {
    let mut event = json!({
        "id": "2f1c-event",
        "eventType": "Microsoft.Storage.BlobCreated",
        "data": { "url": url }
    });
    if let Some(subject) = subject {
        event["subject"] = json!(subject);
    }
    STANDARD.encode(event.to_string())
}

/// In-memory store that counts uploads and can refuse chosen paths
#[derive(Debug, Default)]
pub struct CountingBlobStore {
    inner: InMemoryBlobStore,
    upload_attempts: AtomicUsize,
    failing_uploads: Mutex<HashSet<String>>,
}

impl CountingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upload_of(&self, path: impl Into<String>) {
        self.failing_uploads.lock().insert(path.into());
    }

    pub fn upload_attempts(&self) -> usize {
        self.upload_attempts.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<String> {
        self.inner.paths()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.get(path)
    }
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.inner.fetch(path).await
    }

    async fn upload(&self, path: &str, contents: &[u8]) -> StorageResult<()> {
        self.upload_attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_uploads.lock().contains(path) {
            return Err(StorageError::io(path, "injected failure"));
        }
        self.inner.upload(path, contents).await
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.inner.exists(path).await
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
