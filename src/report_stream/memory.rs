//! Scriptable in-memory sender (for testing).

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::errors::{SendError, SendResult};
use super::ReportSender;

/// Records every report and answers with queued responses, then with a
/// fresh report id once the queue is empty
#[derive(Debug, Default)]
pub struct InMemoryReportSender {
    sent: Mutex<Vec<Vec<u8>>>,
    responses: Mutex<VecDeque<SendResult<String>>>,
}

impl InMemoryReportSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, response: SendResult<String>) {
        self.responses.lock().push_back(response);
    }

    pub fn fail_with(&self, error: SendError) {
        self.respond_with(Err(error));
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl ReportSender for InMemoryReportSender {
    async fn send_report(&self, contents: &[u8]) -> SendResult<String> {
        self.sent.lock().push(contents.to_vec());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Uuid::new_v4().to_string()))
    }

    fn sender_name(&self) -> &'static str {
        "in_memory"
    }
}
