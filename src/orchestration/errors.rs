//! Orchestration error types.

use thiserror::Error;

use super::event::EventError;
use crate::config::PartnerConfigError;
use crate::messaging::MessagingError;
use crate::sftp::TransferError;
use crate::usecases::ReadAndSendError;

/// A content handler could not finish with a message; it will be redelivered
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    #[error("Invalid storage event: {0}")]
    Event(#[from] EventError),

    #[error(transparent)]
    Partner(#[from] PartnerConfigError),

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    ReadAndSend(#[from] ReadAndSendError),
}

pub type HandlerResult<T> = Result<T, HandlerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsumerError {
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(
        "Message {message_id} exceeded max delivery attempts ({delivery_count} > {max_delivery_attempts})"
    )]
    DeliveryThresholdExceeded {
        message_id: String,
        delivery_count: u32,
        max_delivery_attempts: u32,
        /// Whether both the dead-letter enqueue and the primary delete succeeded
        dead_lettered: bool,
    },
}

pub type ConsumerResult<T> = Result<T, ConsumerError>;
