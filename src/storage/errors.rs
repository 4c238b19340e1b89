//! Blob storage errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Blob not found: {path}")]
    NotFound { path: String },

    #[error("Storage I/O error for {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid blob path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid blob URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl StorageError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
