//! Queue service providers.

mod in_memory;
mod pgmq;

pub use self::pgmq::PgmqQueueService;
pub use in_memory::InMemoryQueueService;
