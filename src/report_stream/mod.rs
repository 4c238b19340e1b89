//! # Report Forwarding
//!
//! Hands a single report to ReportStream (or a local stand-in) and
//! classifies the failure when it is refused.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

pub mod errors;
mod file_sender;
mod memory;
pub mod responses;
mod sender;
pub mod token;

pub use errors::{SendError, SendResult};
pub use file_sender::FileReportSender;
pub use memory::InMemoryReportSender;
pub use sender::{ReportStreamSender, ReportStreamSenderConfig};

use crate::config::ReportStreamSettings;
use crate::secrets::{PartnerSecretNames, SecretStore};

#[async_trait]
pub trait ReportSender: Send + Sync + 'static {
    /// Submit a report, returning the id assigned downstream
    async fn send_report(&self, contents: &[u8]) -> SendResult<String>;

    fn sender_name(&self) -> &'static str;
}

/// ReportStream when a base URL is configured, the local file sender otherwise
pub fn build_report_sender(
    settings: &ReportStreamSettings,
    environment: &str,
    secrets: Arc<dyn SecretStore>,
) -> SendResult<Arc<dyn ReportSender>> {
    match settings.base_url.as_deref().filter(|url| !url.is_empty()) {
        Some(base_url) => {
            info!(base_url = %base_url, "ReportStream URL configured, sending to ReportStream");
            let names = PartnerSecretNames::new(&settings.partner_id, environment);
            let sender = ReportStreamSender::new(
                ReportStreamSenderConfig {
                    base_url: base_url.to_string(),
                    client_name: settings.client_name.clone(),
                    scope: settings.scope.clone(),
                    environment: environment.to_string(),
                    private_key_secret: names.report_stream_private_key(),
                    request_timeout: settings.request_timeout(),
                },
                secrets,
            )?;
            Ok(Arc::new(sender))
        }
        None => {
            info!(
                directory = %settings.output_directory.display(),
                "ReportStream URL not set, writing reports to local files"
            );
            Ok(Arc::new(FileReportSender::new(
                settings.output_directory.clone(),
            )))
        }
    }
}
