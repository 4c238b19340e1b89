//! # Read and Send
//!
//! Forwards one staged report to ReportStream and files it under `success`
//! or `failure` according to the answer.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument};

use super::encoding::{convert_to_utf8, EncodingError};
use crate::config::{PartnerConfigs, TextEncoding};
use crate::constants::folders;
use crate::report_stream::{ReportSender, SendError};
use crate::storage::{paths, BlobStore, StorageError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadAndSendError {
    #[error("Failed to read '{path}': {source}")]
    Fetch {
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to encode '{path}': {source}")]
    Encoding {
        path: String,
        #[source]
        source: EncodingError,
    },

    #[error("Failed to send '{path}': {source}")]
    Send {
        path: String,
        #[source]
        source: SendError,
    },
}

/// How a report left this use case when no retry is needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent {
        report_id: String,
        moved_to: Option<String>,
    },
    /// ReportStream refused the report for good
    Rejected { moved_to: Option<String> },
}

pub struct ReadAndSend {
    store: Arc<dyn BlobStore>,
    sender: Arc<dyn ReportSender>,
    /// Used when the path does not start with a known partner id
    encoding: TextEncoding,
    partners: Arc<PartnerConfigs>,
}

impl std::fmt::Debug for ReadAndSend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadAndSend")
            .field("sender", &self.sender.sender_name())
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl ReadAndSend {
    pub fn new(
        store: Arc<dyn BlobStore>,
        sender: Arc<dyn ReportSender>,
        encoding: TextEncoding,
    ) -> Self {
        Self {
            store,
            sender,
            encoding,
            partners: Arc::new(PartnerConfigs::new()),
        }
    }

    /// Resolve the encoding per file from the partner named by the first
    /// path segment (`<partner_id>/import/...`)
    pub fn with_partner_encodings(mut self, partners: Arc<PartnerConfigs>) -> Self {
        self.partners = partners;
        self
    }

    pub fn encoding_for(&self, blob_path: &str) -> TextEncoding {
        blob_path
            .split('/')
            .next()
            .and_then(|partner_id| self.partners.get(partner_id).ok())
            .map_or(self.encoding, |partner| partner.settings.default_encoding)
    }

    /// A permanent rejection is moved to `failure` and reported as `Ok`, so
    /// the triggering message is deleted. Every other failure is an `Err`
    /// and the message is retried.
    #[instrument(skip(self))]
    pub async fn read_and_send(&self, blob_path: &str) -> Result<SendOutcome, ReadAndSendError> {
        let content = self.store.fetch(blob_path).await.map_err(|source| {
            error!(error = %source, "Failed to read the file");
            ReadAndSendError::Fetch {
                path: blob_path.to_string(),
                source,
            }
        })?;

        let encoding = self.encoding_for(blob_path);
        let encoded = convert_to_utf8(content, encoding).map_err(|source| {
            error!(error = %source, encoding = %encoding, "Failed to encode content");
            ReadAndSendError::Encoding {
                path: blob_path.to_string(),
                source,
            }
        })?;

        match self.sender.send_report(&encoded).await {
            Ok(report_id) => {
                info!(report_id = %report_id, "File sent to ReportStream");
                let moved_to = self.move_file(blob_path, folders::SUCCESS).await;
                Ok(SendOutcome::Sent {
                    report_id,
                    moved_to,
                })
            }
            Err(e) if e.is_non_transient() => {
                error!(error = %e, "ReportStream rejected the file, moving to failure");
                let moved_to = self.move_file(blob_path, folders::FAILURE).await;
                Ok(SendOutcome::Rejected { moved_to })
            }
            Err(source) => {
                error!(error = %source, "Failed to send the file to ReportStream");
                Err(ReadAndSendError::Send {
                    path: blob_path.to_string(),
                    source,
                })
            }
        }
    }

    /// Swap the `import` folder segment for `folder`. Failures are logged only.
    async fn move_file(&self, blob_path: &str, folder: &str) -> Option<String> {
        let Some(destination) = paths::replace_folder_segment(blob_path, folders::IMPORT, folder)
        else {
            error!(source = %blob_path, "Unexpected source path, did not move");
            return None;
        };

        match self.store.move_blob(blob_path, &destination).await {
            Ok(()) => Some(destination),
            Err(e) => {
                error!(error = %e, source = %blob_path, destination = %destination, "Failed to move file after processing");
                None
            }
        }
    }
}
