//! # In-Memory Queue Service
//!
//! Thread-safe in-memory queue for testing and local development.
//!
//! ## Features
//!
//! - **Visibility Timeout**: Messages become invisible after dequeue, re-visible after timeout
//! - **Delivery Counting**: Each dequeue increments the message's delivery count
//! - **Lease Receipts**: Each dequeue issues a fresh receipt; stale receipts cannot delete
//! - **TTL Expiry**: Messages with a finite TTL are dropped once expired
//! - **Fault Injection**: Individual operations can be made to fail for tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::traits::QueueService;
use crate::messaging::types::{MessageId, MessageTtl, QueuedMessage, ReceiptHandle};

/// In-memory message with visibility tracking
#[derive(Debug, Clone)]
struct InMemoryQueuedMessage {
    id: u64,
    body: String,
    enqueued_at: DateTime<Utc>,
    /// When the message becomes visible again (None = visible now)
    visible_at: Option<DateTime<Utc>>,
    /// None = never expires
    expires_at: Option<DateTime<Utc>>,
    delivery_count: u32,
    /// Receipt issued by the most recent dequeue
    receipt: Option<String>,
}

/// Operation counters, exposed for assertions in tests
#[derive(Debug, Default)]
struct QueueCounters {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    delete_calls: AtomicU64,
    deleted: AtomicU64,
}

/// Switches that make individual operations fail
#[derive(Debug, Default)]
struct FaultSwitches {
    dequeue: AtomicBool,
    delete: AtomicBool,
    enqueue: AtomicBool,
}

/// In-memory queue service bound to one queue name
#[derive(Debug)]
pub struct InMemoryQueueService {
    queue_name: String,
    messages: Mutex<VecDeque<InMemoryQueuedMessage>>,
    next_id: AtomicU64,
    counters: QueueCounters,
    faults: FaultSwitches,
}

impl InMemoryQueueService {
    /// Create an empty queue
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            messages: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            counters: QueueCounters::default(),
            faults: FaultSwitches::default(),
        }
    }

    /// Number of messages held, visible or in flight (for testing)
    pub fn queue_length(&self) -> usize {
        self.messages.lock().len()
    }

    /// Bodies of all held messages in FIFO order (for testing)
    pub fn bodies(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.body.clone()).collect()
    }

    /// Make every in-flight message visible immediately, as if its lease expired
    pub fn expire_leases(&self) {
        let mut messages = self.messages.lock();
        for msg in messages.iter_mut() {
            msg.visible_at = None;
        }
    }

    /// Total number of `delete_message` calls, successful or not
    pub fn delete_calls(&self) -> u64 {
        self.counters.delete_calls.load(Ordering::Relaxed)
    }

    /// Total number of messages actually removed by `delete_message`
    pub fn deleted_count(&self) -> u64 {
        self.counters.deleted.load(Ordering::Relaxed)
    }

    /// Total number of successful enqueues
    pub fn enqueued_count(&self) -> u64 {
        self.counters.enqueued.load(Ordering::Relaxed)
    }

    /// Whether the message with this ID never expires (for testing)
    pub fn has_infinite_ttl(&self, message_id: &MessageId) -> Option<bool> {
        self.messages
            .lock()
            .iter()
            .find(|m| m.id.to_string() == message_id.as_str())
            .map(|m| m.expires_at.is_none())
    }

    /// Make subsequent dequeues fail (or succeed again)
    pub fn fail_dequeues(&self, fail: bool) {
        self.faults.dequeue.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent deletes fail (or succeed again)
    pub fn fail_deletes(&self, fail: bool) {
        self.faults.delete.store(fail, Ordering::Relaxed);
    }

    /// Make subsequent enqueues fail (or succeed again)
    pub fn fail_enqueues(&self, fail: bool) {
        self.faults.enqueue.store(fail, Ordering::Relaxed);
    }

    fn injected_failure(&self, operation: &str) -> MessagingError {
        MessagingError::queue_operation(&self.queue_name, operation, "injected failure")
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    async fn dequeue_batch(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<QueuedMessage>> {
        if self.faults.dequeue.load(Ordering::Relaxed) {
            return Err(self.injected_failure("dequeue"));
        }

        let lease = chrono::Duration::from_std(visibility_timeout).map_err(|e| {
            MessagingError::queue_operation(&self.queue_name, "dequeue", e.to_string())
        })?;

        let now = Utc::now();
        let visible_until = now + lease;
        let mut messages = self.messages.lock();

        messages.retain(|m| m.expires_at.map(|exp| exp > now).unwrap_or(true));

        let mut received = Vec::new();
        for msg in messages.iter_mut() {
            if received.len() >= max_messages {
                break;
            }

            let is_visible = msg.visible_at.map(|vt| vt <= now).unwrap_or(true);
            if !is_visible {
                continue;
            }

            let receipt = Uuid::new_v4().to_string();
            msg.visible_at = Some(visible_until);
            msg.delivery_count += 1;
            msg.receipt = Some(receipt.clone());
            self.counters.dequeued.fetch_add(1, Ordering::Relaxed);

            received.push(
                QueuedMessage::new(
                    MessageId::from(msg.id),
                    ReceiptHandle::new(receipt),
                    msg.delivery_count,
                    msg.body.clone(),
                    msg.enqueued_at,
                )
                .with_next_visible_at(visible_until),
            );
        }

        Ok(received)
    }

    async fn delete_message(
        &self,
        message_id: &MessageId,
        receipt_handle: &ReceiptHandle,
    ) -> MessagingResult<()> {
        self.counters.delete_calls.fetch_add(1, Ordering::Relaxed);
        if self.faults.delete.load(Ordering::Relaxed) {
            return Err(self.injected_failure("delete"));
        }

        let mut messages = self.messages.lock();
        let pos = messages
            .iter()
            .position(|m| m.id.to_string() == message_id.as_str())
            .ok_or_else(|| MessagingError::message_not_found(message_id.as_str()))?;

        if messages[pos].receipt.as_deref() != Some(receipt_handle.as_str()) {
            return Err(MessagingError::invalid_receipt_handle(
                message_id.as_str(),
                receipt_handle.as_str(),
            ));
        }

        messages.remove(pos);
        self.counters.deleted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn enqueue(&self, body: &str, ttl: MessageTtl) -> MessagingResult<MessageId> {
        if self.faults.enqueue.load(Ordering::Relaxed) {
            return Err(self.injected_failure("enqueue"));
        }

        let now = Utc::now();
        let expires_at = match ttl {
            MessageTtl::Infinite => None,
            MessageTtl::Finite(duration) => {
                let ttl = chrono::Duration::from_std(duration).map_err(|e| {
                    MessagingError::queue_operation(&self.queue_name, "enqueue", e.to_string())
                })?;
                Some(now + ttl)
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.messages.lock().push_back(InMemoryQueuedMessage {
            id,
            body: body.to_string(),
            enqueued_at: now,
            visible_at: None,
            expires_at,
            delivery_count: 0,
            receipt: None,
        });
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);

        Ok(MessageId::from(id))
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_enqueue_and_dequeue() {
        let queue = InMemoryQueueService::new("test_queue");

        let msg_id = queue.enqueue("hello", MessageTtl::Infinite).await.unwrap();
        assert_eq!(msg_id.as_str(), "1");

        let received = queue.dequeue_batch(10, LEASE).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body, "hello");
        assert_eq!(received[0].delivery_count, 1);
        assert!(received[0].next_visible_at.is_some());
    }

    #[tokio::test]
    async fn test_visibility_timeout_hides_message() {
        let queue = InMemoryQueueService::new("test_queue");
        queue.enqueue("hello", MessageTtl::Infinite).await.unwrap();

        assert_eq!(queue.dequeue_batch(10, LEASE).await.unwrap().len(), 1);
        assert_eq!(queue.dequeue_batch(10, LEASE).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_redelivery_increments_delivery_count() {
        let queue = InMemoryQueueService::new("test_queue");
        queue.enqueue("hello", MessageTtl::Infinite).await.unwrap();

        queue.dequeue_batch(10, LEASE).await.unwrap();
        queue.expire_leases();
        let second = queue.dequeue_batch(10, LEASE).await.unwrap();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].delivery_count, 2);
    }

    #[tokio::test]
    async fn test_delete_requires_current_receipt() {
        let queue = InMemoryQueueService::new("test_queue");
        queue.enqueue("hello", MessageTtl::Infinite).await.unwrap();

        let first = queue.dequeue_batch(10, LEASE).await.unwrap().remove(0);
        queue.expire_leases();
        let second = queue.dequeue_batch(10, LEASE).await.unwrap().remove(0);

        let stale = queue
            .delete_message(&first.message_id, &first.receipt_handle)
            .await;
        assert!(matches!(
            stale,
            Err(MessagingError::InvalidReceiptHandle { .. })
        ));

        queue
            .delete_message(&second.message_id, &second.receipt_handle)
            .await
            .unwrap();
        assert_eq!(queue.queue_length(), 0);
        assert_eq!(queue.delete_calls(), 2);
        assert_eq!(queue.deleted_count(), 1);
    }

    #[tokio::test]
    async fn test_finite_ttl_expires() {
        let queue = InMemoryQueueService::new("test_queue");
        queue
            .enqueue("short-lived", MessageTtl::Finite(Duration::from_millis(1)))
            .await
            .unwrap();
        let keeper = queue.enqueue("forever", MessageTtl::Infinite).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        let received = queue.dequeue_batch(10, LEASE).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body, "forever");
        assert_eq!(queue.has_infinite_ttl(&keeper), Some(true));
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let queue = InMemoryQueueService::new("test_queue");
        for i in 0..5 {
            queue
                .enqueue(&format!("message {i}"), MessageTtl::Infinite)
                .await
                .unwrap();
        }

        let received = queue.dequeue_batch(3, LEASE).await.unwrap();
        assert_eq!(received.len(), 3);
        assert_eq!(received[0].body, "message 0");
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let queue = InMemoryQueueService::new("test_queue");
        queue.fail_enqueues(true);
        assert!(queue.enqueue("hello", MessageTtl::Infinite).await.is_err());

        queue.fail_enqueues(false);
        queue.enqueue("hello", MessageTtl::Infinite).await.unwrap();

        queue.fail_dequeues(true);
        assert!(queue.dequeue_batch(1, LEASE).await.is_err());
    }
}
