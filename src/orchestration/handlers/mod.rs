//! # Message Content Handlers
//!
//! What the consumer does with a message body. One handler per queue.

use async_trait::async_trait;

use super::errors::HandlerResult;
use crate::messaging::QueuedMessage;

mod import;
mod polling;

pub use import::ImportMessageHandler;
pub use polling::PollingMessageHandler;

#[async_trait]
pub trait MessageContentHandler: Send + Sync + 'static {
    /// `Ok` means the message is finished and may be deleted
    async fn handle_message_contents(&self, message: &QueuedMessage) -> HandlerResult<()>;

    fn handler_name(&self) -> &'static str;
}
