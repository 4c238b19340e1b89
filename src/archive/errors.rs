//! Whole-archive failures. Per-member failures never surface here; they are
//! recorded in the [`ErrorLedger`](super::ErrorLedger).

use thiserror::Error;

use crate::secrets::SecretError;
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArchiveError {
    #[error("Unable to get zip password: {0}")]
    PasswordUnavailable(#[from] SecretError),

    #[error("Failed to open archive '{archive}': {message}")]
    Open { archive: String, message: String },

    #[error("Archive task for '{archive}' failed: {message}")]
    Task { archive: String, message: String },

    #[error("Failed to upload error ledger '{path}': {source}")]
    LedgerUpload {
        path: String,
        #[source]
        source: StorageError,
    },
}

impl ArchiveError {
    pub fn open(archive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            archive: archive.into(),
            message: message.into(),
        }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
