//! # Queue Service Trait
//!
//! Provider-agnostic operations against a single queue.

use std::time::Duration;

use async_trait::async_trait;

use super::errors::MessagingResult;
use super::types::{MessageId, MessageTtl, QueuedMessage, ReceiptHandle};

/// Operations the consumer needs from one queue
///
/// One instance is bound to one queue; a primary queue and its dead-letter
/// queue are two instances. Implementations must be safe to share across
/// concurrently running message handlers.
#[async_trait]
pub trait QueueService: Send + Sync + 'static {
    /// Name of the queue this instance is bound to
    fn queue_name(&self) -> &str;

    /// Receive up to `max_messages` visible messages
    ///
    /// Received messages are hidden from other consumers for
    /// `visibility_timeout`. If not deleted before it expires they become
    /// visible again and their delivery count increments on the next dequeue.
    async fn dequeue_batch(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<QueuedMessage>>;

    /// Delete a received message using the receipt from its current lease
    async fn delete_message(
        &self,
        message_id: &MessageId,
        receipt_handle: &ReceiptHandle,
    ) -> MessagingResult<()>;

    /// Enqueue an opaque body
    async fn enqueue(&self, body: &str, ttl: MessageTtl) -> MessagingResult<MessageId>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
