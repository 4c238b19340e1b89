//! Crate-level error type used when wiring the service together.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::config::{ConfigurationError, PartnerConfigError};
use crate::messaging::MessagingError;
use crate::orchestration::{ConsumerError, HandlerError};
use crate::report_stream::SendError;
use crate::secrets::SecretError;
use crate::sftp::TransferError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Partner configuration error: {0}")]
    Partner(#[from] PartnerConfigError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Report sender error: {0}")]
    Send(#[from] SendError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Consumer error: {0}")]
    Consumer(#[from] ConsumerError),
}

pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_errors_convert() {
        let err: IngestionError = MessagingError::connection("refused").into();
        assert!(matches!(err, IngestionError::Messaging(_)));
        assert!(err.to_string().contains("refused"));

        let err: IngestionError = StorageError::not_found("import/a.hl7").into();
        assert!(matches!(err, IngestionError::Storage(_)));
    }
}
