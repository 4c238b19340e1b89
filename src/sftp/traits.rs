use std::sync::Arc;

use async_trait::async_trait;

use super::errors::{RemoteResult, TransferResult};

/// One directory listing item on the remote server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

impl RemoteFileEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: 0,
        }
    }
}

/// A connected file-transfer session. Shared across concurrent per-file
/// tasks, so implementations must tolerate concurrent calls.
#[async_trait]
pub trait RemoteFileServer: Send + Sync + 'static {
    async fn read_dir(&self, path: &str) -> RemoteResult<Vec<RemoteFileEntry>>;

    /// Open, read fully and close a remote file
    async fn read_file(&self, path: &str) -> RemoteResult<Vec<u8>>;

    async fn remove(&self, path: &str) -> RemoteResult<()>;

    /// Tear down the session. Later calls fail with `RemoteError::Closed`.
    async fn close(&self) -> RemoteResult<()>;
}

/// Produces a connected [`RemoteFileServer`] for a partner
#[async_trait]
pub trait RemoteConnector: Send + Sync + 'static {
    async fn connect(&self, partner_id: &str) -> TransferResult<Arc<dyn RemoteFileServer>>;
}
