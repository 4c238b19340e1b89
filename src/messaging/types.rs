//! # Messaging Types
//!
//! Core types for the provider-agnostic queue abstraction.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Unique identifier for a queued message
///
/// The format is provider-specific:
/// - PGMQ: i64 message ID as string
/// - InMemory: sequence number as string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new message ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Try to parse the ID as an i64 (for PGMQ compatibility)
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lease receipt required to delete a received message
///
/// A new receipt is issued on every dequeue; receipts from an expired lease
/// are rejected by providers that track them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl ReceiptHandle {
    /// Create a new receipt handle
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ReceiptHandle {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ReceiptHandle {
    fn from(handle: &str) -> Self {
        Self(handle.to_string())
    }
}

/// How long an enqueued message lives before the queue discards it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTtl {
    /// Never expires (dead-letter entries)
    Infinite,
    /// Expires this long after being enqueued
    Finite(Duration),
}

/// A message received from a queue with its lease metadata
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    /// Provider-assigned identifier
    pub message_id: MessageId,

    /// Lease receipt for deleting this delivery
    pub receipt_handle: ReceiptHandle,

    /// Number of times this message has been dequeued, including this one
    pub delivery_count: u32,

    /// Opaque body exactly as it was enqueued
    pub body: String,

    /// When the message was originally enqueued
    pub enqueued_at: DateTime<Utc>,

    /// When the lease expires and the message becomes visible again
    pub next_visible_at: Option<DateTime<Utc>>,
}

impl QueuedMessage {
    /// Create a new queued message
    pub fn new(
        message_id: MessageId,
        receipt_handle: ReceiptHandle,
        delivery_count: u32,
        body: impl Into<String>,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id,
            receipt_handle,
            delivery_count,
            body: body.into(),
            enqueued_at,
            next_visible_at: None,
        }
    }

    /// Set the lease expiry
    pub fn with_next_visible_at(mut self, next_visible_at: DateTime<Utc>) -> Self {
        self.next_visible_at = Some(next_visible_at);
        self
    }
}
