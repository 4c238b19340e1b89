//! In-memory blob store for tests and local development.

use async_trait::async_trait;
use dashmap::DashMap;

use super::errors::{StorageError, StorageResult};
use super::traits::BlobStore;

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob without going through the trait (for testing)
    pub fn insert(&self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.blobs.insert(path.into(), contents.into());
    }

    /// Sorted list of every stored path
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.get(path).map(|e| e.value().clone())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.get(path).ok_or_else(|| StorageError::not_found(path))
    }

    async fn upload(&self, path: &str, contents: &[u8]) -> StorageResult<()> {
        self.blobs.insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(path))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.blobs.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_overwrites() {
        let store = InMemoryBlobStore::new();
        store.upload("import/a.hl7", b"first").await.unwrap();
        store.upload("import/a.hl7", b"second").await.unwrap();

        assert_eq!(store.fetch("import/a.hl7").await.unwrap(), b"second");
        assert_eq!(store.paths(), vec!["import/a.hl7".to_string()]);
    }

    #[tokio::test]
    async fn test_move_blob() {
        let store = InMemoryBlobStore::new();
        store.insert("unzip/report.zip", b"PK".to_vec());

        store
            .move_blob("unzip/report.zip", "unzip/success/report.zip")
            .await
            .unwrap();

        assert!(!store.exists("unzip/report.zip").await.unwrap());
        assert_eq!(store.get("unzip/success/report.zip").unwrap(), b"PK");
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(
            store.fetch("missing").await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(store.move_blob("missing", "elsewhere").await.is_err());
    }
}
