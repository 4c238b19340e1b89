//! # Messaging Module
//!
//! Provider-agnostic queue access for the consumer loop. Each `QueueService`
//! instance is bound to one queue; the consumer pairs a primary queue with a
//! dead-letter queue.
//!
//! ```text
//! QueueService (trait)
//!   ├── PgmqQueueService      <- pgmq extension, read_ct as delivery count
//!   └── InMemoryQueueService  <- tests and local development
//! ```

pub mod errors;
pub mod providers;
mod traits;
mod types;

pub use errors::{MessagingError, MessagingResult};
pub use providers::{InMemoryQueueService, PgmqQueueService};
pub use traits::QueueService;
pub use types::{MessageId, MessageTtl, QueuedMessage, ReceiptHandle};
