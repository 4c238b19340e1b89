//! Writes reports to a local directory instead of sending them. Used when no
//! ReportStream URL is configured.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::errors::{SendError, SendResult};
use super::ReportSender;

#[derive(Debug, Clone)]
pub struct FileReportSender {
    directory: PathBuf,
}

impl FileReportSender {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl ReportSender for FileReportSender {
    async fn send_report(&self, contents: &[u8]) -> SendResult<String> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| SendError::transport(e.to_string()))?;

        let report_id = Uuid::new_v4().to_string();
        let path = self.directory.join(format!("{report_id}.txt"));
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| SendError::transport(e.to_string()))?;

        info!(report_id = %report_id, path = %path.display(), "Wrote report to local directory");
        Ok(report_id)
    }

    fn sender_name(&self) -> &'static str {
        "file"
    }
}
