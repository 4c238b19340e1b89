use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};

use super::MessageContentHandler;
use crate::messaging::QueuedMessage;
use crate::orchestration::errors::HandlerResult;
use crate::orchestration::event::StorageEvent;
use crate::usecases::ReadAndSend;

/// Forwards the blob named by a storage change event
pub struct ImportMessageHandler {
    use_case: Arc<ReadAndSend>,
}

impl ImportMessageHandler {
    pub fn new(use_case: Arc<ReadAndSend>) -> Self {
        Self { use_case }
    }
}

#[async_trait]
impl MessageContentHandler for ImportMessageHandler {
    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    async fn handle_message_contents(&self, message: &QueuedMessage) -> HandlerResult<()> {
        let blob_path = StorageEvent::from_message_text(&message.body)
            .and_then(|event| event.blob_path())
            .map_err(|e| {
                error!(error = %e, "Failed to get the file path");
                e
            })?;

        info!(blob_path = %blob_path, "Handling import message");
        self.use_case.read_and_send(&blob_path).await?;
        Ok(())
    }

    fn handler_name(&self) -> &'static str {
        "import"
    }
}
