//! # Orchestration
//!
//! The queue consumer and the handlers it dispatches to.

pub mod errors;
pub mod event;
pub mod handlers;
mod queue_consumer;

pub use errors::{ConsumerError, ConsumerResult, HandlerError, HandlerResult};
pub use event::{EventError, StorageEvent};
pub use handlers::{ImportMessageHandler, MessageContentHandler, PollingMessageHandler};
pub use queue_consumer::{MessageOutcome, MessageReport, QueueConsumer, QueueConsumerConfig};
