//! # SFTP Ingestion Service
//!
//! Runs the import and polling queue consumers until Ctrl+C or SIGTERM.
//!
//! ```bash
//! # Local development: filesystem storage, in-memory queues, file sender
//! cargo run --bin sftp-ingestion
//!
//! # Against pgmq and ReportStream
//! ENV=stg QUEUE_DATABASE_URL=postgres://... REPORT_STREAM_URL_PREFIX=https://... \
//!     cargo run --bin sftp-ingestion
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use sftp_ingestion::config::{load_partner_configs, ConfigLoader, IngestionConfig, QueueSettings, TextEncoding};
use sftp_ingestion::logging;
use sftp_ingestion::messaging::{InMemoryQueueService, PgmqQueueService, QueueService};
use sftp_ingestion::orchestration::{
    ImportMessageHandler, MessageContentHandler, PollingMessageHandler, QueueConsumer,
    QueueConsumerConfig,
};
use sftp_ingestion::report_stream::build_report_sender;
use sftp_ingestion::secrets::build_secret_store;
use sftp_ingestion::sftp::SftpConnector;
use sftp_ingestion::storage::build_blob_store;
use sftp_ingestion::usecases::ReadAndSend;
use sftp_ingestion::IngestionError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("🚀 Starting SFTP ingestion service...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::load().context("Failed to load configuration")?;
    info!("   Environment: {}", config.environment);

    let consumers = build_consumers(&config)
        .await
        .context("Failed to build queue consumers")?;

    let mut loops = JoinSet::new();
    for consumer in consumers {
        info!(queue = %consumer.queue_name(), "Starting consumer");
        loops.spawn(async move { consumer.poll_loop().await });
    }

    info!("🎉 SFTP ingestion service started");
    info!("   Press Ctrl+C to shutdown");

    tokio::select! {
        _ = shutdown_signal() => {
            info!("🛑 Shutdown signal received");
        }
        Some(joined) = loops.join_next() => {
            error!(result = ?joined, "Consumer loop exited unexpectedly");
        }
    }

    // In-flight messages are abandoned; their leases expire and they are redelivered
    loops.shutdown().await;
    info!("👋 SFTP ingestion service shutdown complete");

    Ok(())
}

async fn build_consumers(config: &IngestionConfig) -> Result<Vec<QueueConsumer>, IngestionError> {
    let store = build_blob_store(&config.storage);
    let secrets = build_secret_store(&config.secrets);
    let sender = build_report_sender(&config.report_stream, &config.environment, secrets.clone())?;

    let partners = Arc::new(load_partner_configs(store.as_ref(), &config.partners.known_ids).await);
    info!(partner_count = partners.len(), "Partner configurations loaded");

    let fallback_encoding = partners
        .get(&config.report_stream.partner_id)
        .map(|partner| partner.settings.default_encoding)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to ISO-8859-1 for reports outside a partner folder");
            TextEncoding::Iso88591
        });

    let read_and_send = Arc::new(
        ReadAndSend::new(store.clone(), sender, fallback_encoding)
            .with_partner_encodings(partners.clone()),
    );
    let import_handler: Arc<dyn MessageContentHandler> =
        Arc::new(ImportMessageHandler::new(read_and_send));

    let connector = Arc::new(SftpConnector::new(secrets.clone(), &config.environment));
    let polling_handler: Arc<dyn MessageContentHandler> = Arc::new(PollingMessageHandler::new(
        partners,
        connector,
        store,
        secrets,
        &config.environment,
    ));

    let consumer_config = QueueConsumerConfig::from_settings(&config.queue);
    let mut consumers = Vec::new();
    for (queue_name, handler) in [
        (&config.queue.import_queue, import_handler),
        (&config.queue.polling_queue, polling_handler),
    ] {
        let (queue, dead_letter_queue) = build_queue_pair(&config.queue, queue_name).await?;
        consumers.push(QueueConsumer::new(
            queue,
            dead_letter_queue,
            handler,
            consumer_config.clone(),
        ));
    }

    Ok(consumers)
}

/// pgmq when a database URL is configured, in-memory queues otherwise
async fn build_queue_pair(
    settings: &QueueSettings,
    queue_name: &str,
) -> Result<(Arc<dyn QueueService>, Arc<dyn QueueService>), IngestionError> {
    let dead_letter_name = settings.dead_letter_queue_name(queue_name);

    match settings.database_url.as_deref().filter(|url| !url.is_empty()) {
        Some(database_url) => {
            let queue = PgmqQueueService::connect(database_url, queue_name).await?;
            let dead_letter_queue = queue.for_queue(dead_letter_name);
            queue.ensure_queue().await?;
            dead_letter_queue.ensure_queue().await?;
            Ok((Arc::new(queue), Arc::new(dead_letter_queue)))
        }
        None => {
            warn!(queue = %queue_name, "No queue database URL configured, using in-memory queues");
            Ok((
                Arc::new(InMemoryQueueService::new(queue_name)),
                Arc::new(InMemoryQueueService::new(dead_letter_name)),
            ))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
