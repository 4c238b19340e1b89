use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use super::MessageContentHandler;
use crate::archive::ArchiveExtractor;
use crate::config::{PartnerConfig, PartnerConfigs};
use crate::messaging::QueuedMessage;
use crate::orchestration::errors::HandlerResult;
use crate::secrets::{PartnerSecretNames, SecretStore};
use crate::sftp::{RemoteConnector, TransferPipeline, TransferReport};
use crate::storage::BlobStore;

/// Pulls a partner's files off their SFTP server. The message body is the
/// partner id.
pub struct PollingMessageHandler {
    partners: Arc<PartnerConfigs>,
    connector: Arc<dyn RemoteConnector>,
    store: Arc<dyn BlobStore>,
    secrets: Arc<dyn SecretStore>,
    environment: String,
}

impl PollingMessageHandler {
    pub fn new(
        partners: Arc<PartnerConfigs>,
        connector: Arc<dyn RemoteConnector>,
        store: Arc<dyn BlobStore>,
        secrets: Arc<dyn SecretStore>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            partners,
            connector,
            store,
            secrets,
            environment: environment.into(),
        }
    }

    /// Connect, copy everything in the starting directory, close. Failing to
    /// connect or list is an error; individual file failures are in the
    /// report and get another chance on the next poll.
    #[instrument(skip(self, partner), fields(partner_id = %partner.partner_id))]
    pub async fn poll_partner(&self, partner: &PartnerConfig) -> HandlerResult<TransferReport> {
        let partner_id = partner.partner_id.as_str();
        let server = self.connector.connect(partner_id).await.map_err(|e| {
            error!(error = %e, "Failed to connect to partner SFTP server");
            e
        })?;

        let names = PartnerSecretNames::new(partner_id, &self.environment);
        let password_secret = partner
            .settings
            .has_zip_password
            .then(|| names.zip_password());
        let extractor = Arc::new(ArchiveExtractor::new(
            self.store.clone(),
            self.secrets.clone(),
            password_secret,
        ));
        let pipeline = TransferPipeline::new(
            server.clone(),
            self.store.clone(),
            self.secrets.clone(),
            extractor,
            names,
        );

        let result = pipeline.copy_files().await;

        if let Err(e) = server.close().await {
            error!(error = %e, "Failed to close SFTP connection");
        }

        let report = result?;
        for (file_name, e) in report.failures() {
            warn!(file_name = %file_name, error = %e, "File left on SFTP server for the next poll");
        }
        Ok(report)
    }
}

#[async_trait]
impl MessageContentHandler for PollingMessageHandler {
    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    async fn handle_message_contents(&self, message: &QueuedMessage) -> HandlerResult<()> {
        let partner_id = message.body.trim();
        info!(partner_id = %partner_id, "Handling polling message");

        let partner = self.partners.get(partner_id).map_err(|e| {
            error!(error = %e, "Partner not found in config");
            e
        })?;

        if !partner.settings.is_active {
            // Deleting the message keeps triggers from piling up during planned downtime
            warn!(partner_id = %partner_id, "Partner not active, skipping");
            return Ok(());
        }

        let report = self.poll_partner(partner).await?;
        info!(
            partner_id = %partner_id,
            copied = report.copied_count(),
            failed = report.failure_count(),
            "Finished polling partner"
        );
        Ok(())
    }

    fn handler_name(&self) -> &'static str {
        "polling"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PartnerSettings, TextEncoding};
    use crate::messaging::{MessageId, ReceiptHandle};
    use crate::orchestration::errors::HandlerError;
    use crate::secrets::InMemorySecretStore;
    use crate::sftp::{InMemoryRemoteConnector, InMemoryRemoteFileServer};
    use crate::storage::InMemoryBlobStore;

    fn settings(is_active: bool) -> PartnerSettings {
        PartnerSettings {
            display_name: "Flexion".to_string(),
            is_active,
            is_external_sftp_connection: true,
            has_zip_password: false,
            default_encoding: TextEncoding::Utf8,
        }
    }

    fn message(body: &str) -> QueuedMessage {
        QueuedMessage::new(
            MessageId::from(1_i64),
            ReceiptHandle::from(1_i64),
            1,
            body,
            chrono::Utc::now(),
        )
    }

    struct Fixture {
        server: Arc<InMemoryRemoteFileServer>,
        connector: Arc<InMemoryRemoteConnector>,
        store: Arc<InMemoryBlobStore>,
        handler: PollingMessageHandler,
    }

    fn fixture(partners: PartnerConfigs) -> Fixture {
        let server = Arc::new(InMemoryRemoteFileServer::new());
        let connector = Arc::new(InMemoryRemoteConnector::new(server.clone()));
        let store = Arc::new(InMemoryBlobStore::new());
        let secrets = Arc::new(
            InMemorySecretStore::new().with_secret("flexion-sftp-starting-directory-local", "outbox"),
        );
        let handler = PollingMessageHandler::new(
            Arc::new(partners),
            connector.clone(),
            store.clone(),
            secrets,
            "local",
        );
        Fixture {
            server,
            connector,
            store,
            handler,
        }
    }

    #[tokio::test]
    async fn test_unknown_partner_is_an_error() {
        let f = fixture(PartnerConfigs::new());

        let result = f.handler.handle_message_contents(&message("nobody")).await;

        assert!(matches!(result, Err(HandlerError::Partner(_))));
        assert_eq!(f.connector.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_inactive_partner_is_skipped() {
        let f = fixture(PartnerConfigs::new().with_partner("flexion", settings(false)));

        f.handler
            .handle_message_contents(&message("flexion"))
            .await
            .unwrap();

        assert_eq!(f.connector.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_active_partner_is_copied_and_connection_closed() {
        let f = fixture(PartnerConfigs::new().with_partner("flexion", settings(true)));
        f.server.add_file("outbox/a.hl7", b"MSH|a".to_vec());

        f.handler
            .handle_message_contents(&message("flexion\n"))
            .await
            .unwrap();

        assert_eq!(f.store.paths(), vec!["import/a.hl7"]);
        assert!(f.server.is_closed());
    }

    #[tokio::test]
    async fn test_connection_failure_fails_the_message() {
        let f = fixture(PartnerConfigs::new().with_partner("flexion", settings(true)));
        f.connector.fail_connect(true);

        let result = f.handler.handle_message_contents(&message("flexion")).await;

        assert!(matches!(result, Err(HandlerError::Transfer(_))));
    }
}
