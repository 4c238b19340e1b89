//! # Storage Change Events
//!
//! Import queue messages carry a base64-encoded storage event whose
//! `data.url` names the blob that changed:
//!
//! ```json
//! {
//!   "subject": "/blobServices/default/containers/sftp/blobs/customer/import/msg2.hl7",
//!   "eventType": "Microsoft.Storage.BlobCreated",
//!   "data": { "url": "https://host/sftp/customer/import/msg2.hl7" }
//! }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::{paths, StorageError};

const SUBJECT_BLOB_MARKER: &str = "blobs/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Failed to decode message text: {0}")]
    Base64(String),

    #[error("Failed to unmarshal event: {0}")]
    Json(String),

    #[error("Could not read event data as an object")]
    DataNotObject,

    #[error("Could not read event data url as a string")]
    UrlNotString,

    #[error("Failed to parse subject '{subject}'")]
    Subject { subject: String },

    #[error(transparent)]
    Url(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl StorageEvent {
    /// Decode a queue message body
    pub fn from_message_text(text: &str) -> Result<Self, EventError> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| EventError::Base64(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| EventError::Json(e.to_string()))
    }

    pub fn url(&self) -> Result<&str, EventError> {
        let data = self.data.as_object().ok_or(EventError::DataNotObject)?;
        data.get("url")
            .and_then(Value::as_str)
            .ok_or(EventError::UrlNotString)
    }

    /// Blob path named by the subject: exactly one `blobs/` marker is expected
    pub fn subject_blob_path(&self) -> Option<Result<&str, EventError>> {
        let subject = self.subject.as_deref()?;
        let parts: Vec<&str> = subject.split(SUBJECT_BLOB_MARKER).collect();
        Some(match parts.as_slice() {
            [_, path] => Ok(*path),
            _ => Err(EventError::Subject {
                subject: subject.to_string(),
            }),
        })
    }

    /// Container-relative path of the changed blob. A subject, when present,
    /// must be well formed even though the path itself comes from `data.url`.
    pub fn blob_path(&self) -> Result<String, EventError> {
        if let Some(subject_path) = self.subject_blob_path() {
            subject_path?;
        }
        Ok(paths::blob_path_from_url(self.url()?)?)
    }
}
