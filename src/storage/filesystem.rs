//! Blob store rooted at a local directory, used for local development in
//! place of a cloud container.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::errors::{StorageError, StorageResult};
use super::paths::validate_blob_path;
use super::traits::BlobStore;

#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StorageResult<PathBuf> {
        validate_blob_path(path)?;
        Ok(self.root.join(path))
    }
}

fn map_io_error(path: &str, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::not_found(path)
    } else {
        StorageError::io(path, err.to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.resolve(path)?;
        tokio::fs::read(&full_path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn upload(&self, path: &str, contents: &[u8]) -> StorageResult<()> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io_error(path, e))?;
        }

        tokio::fs::write(&full_path, contents)
            .await
            .map_err(|e| map_io_error(path, e))?;

        debug!(path = %path, bytes = contents.len(), "Uploaded blob to local storage");
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let full_path = self.resolve(path)?;
        tokio::fs::remove_file(&full_path)
            .await
            .map_err(|e| map_io_error(path, e))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let full_path = self.resolve(path)?;
        tokio::fs::try_exists(&full_path)
            .await
            .map_err(|e| map_io_error(path, e))
    }
}
