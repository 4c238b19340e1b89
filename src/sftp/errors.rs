//! Remote transfer errors, split by scope: a single remote call, a whole
//! transfer pass, and one file within a pass.

use thiserror::Error;

use crate::secrets::SecretError;
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("Failed to connect to '{address}': {message}")]
    Connection { address: String, message: String },

    #[error("Invalid host public key: {message}")]
    InvalidHostKey { message: String },

    #[error("Host key presented by '{address}' does not match the configured key")]
    HostKeyMismatch { address: String },

    #[error("Authentication failed for user '{user}': {message}")]
    Authentication { user: String, message: String },

    #[error("Remote {operation} failed for '{path}': {message}")]
    Operation {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Remote connection is closed")]
    Closed,

    #[error("Remote task failed: {message}")]
    Task { message: String },
}

impl RemoteError {
    pub fn connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn invalid_host_key(message: impl Into<String>) -> Self {
        Self::InvalidHostKey {
            message: message.into(),
        }
    }

    pub fn authentication(user: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            user: user.into(),
            message: message.into(),
        }
    }

    pub fn operation(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Operation {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}

/// Failures that abort a whole connection or transfer pass
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    #[error("Unable to get secret '{name}': {source}")]
    Secret {
        name: String,
        #[source]
        source: SecretError,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl TransferError {
    pub fn secret(name: impl Into<String>, source: SecretError) -> Self {
        Self::Secret {
            name: name.into(),
            source,
        }
    }
}

/// Failure of one file within a pass; siblings are unaffected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FileTransferError {
    #[error("Failed to read remote file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to upload '{path}': {source}")]
    Upload {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to write scratch copy of '{path}': {message}")]
    Scratch { path: String, message: String },

    #[error("Failed to remove remote file '{path}': {source}")]
    Remove {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("Transfer task for '{file_name}' did not complete: {message}")]
    Task { file_name: String, message: String },
}

pub type RemoteResult<T> = Result<T, RemoteError>;
pub type TransferResult<T> = Result<T, TransferError>;
