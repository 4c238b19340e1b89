use async_trait::async_trait;
use tracing::{error, info};

use super::errors::StorageResult;

/// Content store addressed by slash-separated paths
///
/// Uploading to an existing path overwrites it. Implementations must be safe
/// for concurrent use by many transfer units at once.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Fetch the full contents of a blob
    async fn fetch(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Create or overwrite a blob
    async fn upload(&self, path: &str, contents: &[u8]) -> StorageResult<()>;

    /// Delete a blob
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Whether a blob exists at `path`
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Move a blob by fetching, uploading to the destination, then deleting the source
    ///
    /// Not atomic: a failed delete leaves the blob at both paths.
    async fn move_blob(&self, source: &str, destination: &str) -> StorageResult<()> {
        let contents = self.fetch(source).await?;
        self.upload(destination, &contents).await?;
        self.delete(source).await.map_err(|e| {
            error!(source = %source, error = %e, "Error deleting source blob after copy");
            e
        })?;

        info!(source = %source, destination = %destination, "Moved blob");
        Ok(())
    }
}
