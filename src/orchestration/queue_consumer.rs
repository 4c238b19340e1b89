//! # Queue Consumer
//!
//! Turns an at-least-once queue into a bounded-retry trigger for a
//! [`MessageContentHandler`].
//!
//! Per message: `Dequeued -> threshold check -> DeadLettered | Dispatched ->
//! Deleted | LeftForRedelivery`. Nothing is acknowledged explicitly; a
//! message that is not deleted becomes visible again when its lease expires
//! and comes back with a higher delivery count.
//!
//! Dead-lettering is two separate queue calls (enqueue, then delete) and is
//! not atomic. A crash between them leaves the message in both queues; a
//! failed enqueue skips the delete so the message is never lost.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::errors::{ConsumerError, ConsumerResult};
use super::handlers::MessageContentHandler;
use crate::config::QueueSettings;
use crate::messaging::{MessageId, MessageTtl, QueueService, QueuedMessage};

#[derive(Debug, Clone)]
pub struct QueueConsumerConfig {
    pub batch_size: usize,
    /// Lease long enough to cover worst-case processing of one message
    pub visibility_timeout: Duration,
    pub poll_interval: Duration,
    pub max_delivery_attempts: u32,
}

impl QueueConsumerConfig {
    pub fn from_settings(settings: &QueueSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            visibility_timeout: settings.visibility_timeout(),
            poll_interval: settings.poll_interval(),
            max_delivery_attempts: settings.max_delivery_attempts(),
        }
    }
}

impl Default for QueueConsumerConfig {
    fn default() -> Self {
        Self::from_settings(&QueueSettings::default())
    }
}

/// What happened to a message that did not hit the delivery threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Deleted,
    /// The handler failed; the lease will expire and the message returns
    LeftForRedelivery { reason: String },
}

/// Collected result of one message task
#[derive(Debug, Clone, PartialEq)]
pub struct MessageReport {
    pub message_id: MessageId,
    pub delivery_count: u32,
    pub result: ConsumerResult<MessageOutcome>,
}

#[derive(Clone)]
pub struct QueueConsumer {
    queue: Arc<dyn QueueService>,
    dead_letter_queue: Arc<dyn QueueService>,
    handler: Arc<dyn MessageContentHandler>,
    config: QueueConsumerConfig,
}

impl std::fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("queue", &self.queue.queue_name())
            .field("dead_letter_queue", &self.dead_letter_queue.queue_name())
            .field("handler", &self.handler.handler_name())
            .field("config", &self.config)
            .finish()
    }
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn QueueService>,
        dead_letter_queue: Arc<dyn QueueService>,
        handler: Arc<dyn MessageContentHandler>,
        config: QueueConsumerConfig,
    ) -> Self {
        Self {
            queue,
            dead_letter_queue,
            handler,
            config,
        }
    }

    pub fn queue_name(&self) -> &str {
        self.queue.queue_name()
    }

    /// Poll forever. Each iteration receives one batch and then sleeps for
    /// the poll interval, whatever the outcome.
    #[instrument(skip(self), fields(queue = %self.queue.queue_name()))]
    pub async fn poll_loop(&self) {
        info!(
            dead_letter_queue = %self.dead_letter_queue.queue_name(),
            handler = self.handler.handler_name(),
            max_delivery_attempts = self.config.max_delivery_attempts,
            "Starting queue polling loop"
        );

        let mut in_flight = JoinSet::new();
        loop {
            if let Err(e) = self.receive_queue(&mut in_flight).await {
                error!(error = %e, "Failed to receive messages");
            }

            reap_finished(&mut in_flight);
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Dequeue one batch and spawn a task per message into `in_flight`.
    /// Returns how many tasks were started.
    pub async fn receive_queue(
        &self,
        in_flight: &mut JoinSet<MessageReport>,
    ) -> ConsumerResult<usize> {
        let messages = self
            .queue
            .dequeue_batch(self.config.batch_size, self.config.visibility_timeout)
            .await?;

        debug!(
            queue = %self.queue.queue_name(),
            message_count = messages.len(),
            "Dequeued messages"
        );

        let count = messages.len();
        for message in messages {
            let consumer = self.clone();
            in_flight.spawn(async move {
                let result = consumer.handle_message(&message).await;
                if let Err(e) = &result {
                    error!(message_id = %message.message_id, error = %e, "Unable to handle message");
                }
                MessageReport {
                    message_id: message.message_id,
                    delivery_count: message.delivery_count,
                    result,
                }
            });
        }

        Ok(count)
    }

    /// Receive one batch and wait for every message task to finish
    pub async fn process_batch(&self) -> ConsumerResult<Vec<MessageReport>> {
        let mut in_flight = JoinSet::new();
        self.receive_queue(&mut in_flight).await?;

        let mut reports = Vec::with_capacity(in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!(error = %e, "Message task did not complete"),
            }
        }
        Ok(reports)
    }

    /// Threshold check, then dispatch. The message is deleted only when the
    /// handler succeeds.
    #[instrument(skip(self, message), fields(message_id = %message.message_id, delivery_count = message.delivery_count))]
    pub async fn handle_message(&self, message: &QueuedMessage) -> ConsumerResult<MessageOutcome> {
        if let Some(dead_lettered) = self.over_delivery_threshold(message).await {
            return Err(ConsumerError::DeliveryThresholdExceeded {
                message_id: message.message_id.to_string(),
                delivery_count: message.delivery_count,
                max_delivery_attempts: self.config.max_delivery_attempts,
                dead_lettered,
            });
        }

        match self.handler.handle_message_contents(message).await {
            Ok(()) => {
                self.queue
                    .delete_message(&message.message_id, &message.receipt_handle)
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "Failed to delete message");
                        e
                    })?;
                info!("Message handled and deleted");
                Ok(MessageOutcome::Deleted)
            }
            Err(e) => {
                warn!(error = %e, "Failed to handle message, leaving it for redelivery");
                Ok(MessageOutcome::LeftForRedelivery {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// `None` when under the threshold. Otherwise the message is
    /// dead-lettered and the result says whether that fully succeeded.
    pub async fn over_delivery_threshold(&self, message: &QueuedMessage) -> Option<bool> {
        if message.delivery_count <= self.config.max_delivery_attempts {
            return None;
        }

        error!(
            message_id = %message.message_id,
            delivery_count = message.delivery_count,
            max_delivery_attempts = self.config.max_delivery_attempts,
            "Message reached maximum number of delivery attempts"
        );
        Some(self.dead_letter(message).await.is_ok())
    }

    /// Copy the body to the dead-letter queue with no expiry, then delete the
    /// original. The delete is skipped when the enqueue fails.
    pub async fn dead_letter(&self, message: &QueuedMessage) -> ConsumerResult<MessageId> {
        let dead_letter_id = self
            .dead_letter_queue
            .enqueue(&message.body, MessageTtl::Infinite)
            .await
            .map_err(|e| {
                error!(
                    message_id = %message.message_id,
                    dead_letter_queue = %self.dead_letter_queue.queue_name(),
                    error = %e,
                    "Failed to enqueue message to dead-letter queue"
                );
                e
            })?;

        self.queue
            .delete_message(&message.message_id, &message.receipt_handle)
            .await
            .map_err(|e| {
                error!(
                    message_id = %message.message_id,
                    dead_letter_id = %dead_letter_id,
                    error = %e,
                    "Failed to delete dead-lettered message from primary queue"
                );
                e
            })?;

        info!(
            message_id = %message.message_id,
            dead_letter_id = %dead_letter_id,
            dead_letter_queue = %self.dead_letter_queue.queue_name(),
            "Message moved to dead-letter queue"
        );
        Ok(dead_letter_id)
    }
}

/// Collect finished tasks without waiting on running ones
fn reap_finished(in_flight: &mut JoinSet<MessageReport>) {
    while let Some(Some(joined)) = in_flight.join_next().now_or_never() {
        if let Err(e) = joined {
            error!(error = %e, "Message task did not complete");
        }
    }
}
