//! # PostgreSQL Message Queue Service (pgmq-rs)
//!
//! `QueueService` backed by the pgmq extension. pgmq has no separate lease
//! receipt, so the message ID doubles as the receipt handle, and `read_ct`
//! is the delivery count. Messages never expire, which is exactly what a
//! dead-letter queue needs; finite TTLs are rejected.

use std::time::Duration;

use async_trait::async_trait;
use ::pgmq::PGMQueue;
use tracing::{debug, info};

use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::traits::QueueService;
use crate::messaging::types::{MessageId, MessageTtl, QueuedMessage, ReceiptHandle};

/// pgmq-rs based queue service bound to one queue
#[derive(Debug, Clone)]
pub struct PgmqQueueService {
    pgmq: PGMQueue,
    queue_name: String,
}

impl PgmqQueueService {
    /// Connect using a connection string
    pub async fn connect(database_url: &str, queue_name: impl Into<String>) -> MessagingResult<Self> {
        let queue_name = queue_name.into();
        info!(queue = %queue_name, "Connecting to pgmq");

        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::connection(e.to_string()))?;

        Ok(Self { pgmq, queue_name })
    }

    /// Bind another queue to an existing connection (shares the pool)
    pub fn for_queue(&self, queue_name: impl Into<String>) -> Self {
        Self {
            pgmq: self.pgmq.clone(),
            queue_name: queue_name.into(),
        }
    }

    /// Create the queue if it doesn't exist (idempotent)
    pub async fn ensure_queue(&self) -> MessagingResult<()> {
        debug!(queue = %self.queue_name, "Ensuring queue exists");

        self.pgmq.create(&self.queue_name).await.map_err(|e| {
            MessagingError::queue_operation(&self.queue_name, "create", e.to_string())
        })
    }

    fn message_id_as_i64(&self, message_id: &MessageId) -> MessagingResult<i64> {
        message_id.as_i64().ok_or_else(|| {
            MessagingError::queue_operation(
                &self.queue_name,
                "delete",
                format!("non-numeric message id {message_id}"),
            )
        })
    }
}

#[async_trait]
impl QueueService for PgmqQueueService {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn dequeue_batch(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<QueuedMessage>> {
        let vt = i32::try_from(visibility_timeout.as_secs()).unwrap_or(i32::MAX);
        let qty = i32::try_from(max_messages).unwrap_or(i32::MAX);

        let messages = self
            .pgmq
            .read_batch::<serde_json::Value>(&self.queue_name, Some(vt), qty)
            .await
            .map_err(|e| {
                MessagingError::queue_operation(&self.queue_name, "read_batch", e.to_string())
            })?
            .unwrap_or_default();

        debug!(
            queue = %self.queue_name,
            count = messages.len(),
            "Read messages from pgmq"
        );

        Ok(messages
            .into_iter()
            .map(|msg| {
                let body = match msg.message {
                    serde_json::Value::String(body) => body,
                    other => other.to_string(),
                };
                QueuedMessage::new(
                    MessageId::from(msg.msg_id),
                    ReceiptHandle::from(msg.msg_id),
                    u32::try_from(msg.read_ct).unwrap_or(0),
                    body,
                    msg.enqueued_at,
                )
                .with_next_visible_at(msg.vt)
            })
            .collect())
    }

    async fn delete_message(
        &self,
        message_id: &MessageId,
        _receipt_handle: &ReceiptHandle,
    ) -> MessagingResult<()> {
        let msg_id = self.message_id_as_i64(message_id)?;

        let deleted = self.pgmq.delete(&self.queue_name, msg_id).await.map_err(|e| {
            MessagingError::queue_operation(&self.queue_name, "delete", e.to_string())
        })?;

        if deleted == 0 {
            return Err(MessagingError::message_not_found(message_id.as_str()));
        }
        Ok(())
    }

    async fn enqueue(&self, body: &str, ttl: MessageTtl) -> MessagingResult<MessageId> {
        if let MessageTtl::Finite(_) = ttl {
            return Err(MessagingError::unsupported("pgmq", "finite message TTL"));
        }

        let message_id = self
            .pgmq
            .send(&self.queue_name, &serde_json::Value::String(body.to_string()))
            .await
            .map_err(|e| MessagingError::queue_operation(&self.queue_name, "send", e.to_string()))?;

        Ok(MessageId::from(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "pgmq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pgmq_roundtrip() {
        // Requires a PostgreSQL database with the pgmq extension
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            println!("Skipping pgmq test - no TEST_DATABASE_URL provided");
            return;
        };

        let queue = PgmqQueueService::connect(&database_url, "ingestion_roundtrip_test")
            .await
            .expect("Failed to connect to pgmq");
        queue.ensure_queue().await.expect("Failed to create queue");

        let id = queue
            .enqueue("ca-phl", MessageTtl::Infinite)
            .await
            .expect("Failed to send");
        let received = queue
            .dequeue_batch(10, Duration::from_secs(30))
            .await
            .expect("Failed to read");

        let msg = received
            .iter()
            .find(|m| m.message_id == id)
            .expect("sent message should be readable");
        assert_eq!(msg.body, "ca-phl");
        assert_eq!(msg.delivery_count, 1);

        queue
            .delete_message(&msg.message_id, &msg.receipt_handle)
            .await
            .expect("Failed to delete");
    }
}
