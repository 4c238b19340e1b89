//! # Ingestion Configuration
//!
//! Process configuration is layered with the `config` crate:
//!
//! 1. built-in defaults ([`IngestionConfig::default`])
//! 2. `config/<environment>.toml`, when present
//! 3. `INGESTION__SECTION__FIELD` environment overrides
//! 4. the flat variables older deployments set (`ENV`,
//!    `QUEUE_MAX_DELIVERY_ATTEMPTS`, `QUEUE_DATABASE_URL`,
//!    `REPORT_STREAM_URL_PREFIX`, `REPORT_STREAM_CLIENT_NAME`)
//!
//! ```rust,no_run
//! use sftp_ingestion::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?;
//! let max_attempts = config.queue.max_delivery_attempts();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;
pub mod partner;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{self, partners, queue};
use crate::secrets::SecretStoreKind;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{ConfigLoader, LegacyVariables};
pub use partner::{
    load_partner_config, load_partner_configs, PartnerConfig, PartnerConfigError, PartnerConfigs,
    PartnerSettings, TextEncoding,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub environment: String,
    pub queue: QueueSettings,
    pub storage: StorageSettings,
    pub secrets: SecretStoreKind,
    pub report_stream: ReportStreamSettings,
    pub partners: PartnerListSettings,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            environment: constants::DEFAULT_ENVIRONMENT.to_string(),
            queue: QueueSettings::default(),
            storage: StorageSettings::default(),
            secrets: SecretStoreKind::default(),
            report_stream: ReportStreamSettings::default(),
            partners: PartnerListSettings::default(),
        }
    }
}

impl IngestionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.environment.trim().is_empty() {
            return Err(ConfigurationError::validation_error(
                "environment must not be empty",
            ));
        }
        self.queue.validate()?;
        if self.report_stream.client_name.trim().is_empty() {
            return Err(ConfigurationError::validation_error(
                "report_stream.client_name must not be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// pgmq connection URL; the in-memory queue is used when absent
    pub database_url: Option<String>,
    pub import_queue: String,
    pub polling_queue: String,
    pub dead_letter_suffix: String,
    pub batch_size: usize,
    pub visibility_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    /// Kept as text so a malformed value falls back to the default instead
    /// of failing startup
    pub max_delivery_attempts: Option<String>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            import_queue: queue::DEFAULT_IMPORT_QUEUE.to_string(),
            polling_queue: queue::DEFAULT_POLLING_QUEUE.to_string(),
            dead_letter_suffix: queue::DEAD_LETTER_SUFFIX.to_string(),
            batch_size: queue::DEFAULT_BATCH_SIZE,
            visibility_timeout_seconds: queue::DEFAULT_VISIBILITY_TIMEOUT.as_secs(),
            poll_interval_seconds: queue::DEFAULT_POLL_INTERVAL.as_secs(),
            max_delivery_attempts: None,
        }
    }
}

impl QueueSettings {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn max_delivery_attempts(&self) -> u32 {
        parse_max_delivery_attempts(self.max_delivery_attempts.as_deref())
    }

    pub fn dead_letter_queue_name(&self, queue_name: &str) -> String {
        format!("{}{}", queue_name, self.dead_letter_suffix)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.import_queue.trim().is_empty() || self.polling_queue.trim().is_empty() {
            return Err(ConfigurationError::validation_error(
                "queue names must not be empty",
            ));
        }
        if self.dead_letter_suffix.is_empty() {
            return Err(ConfigurationError::validation_error(
                "queue.dead_letter_suffix must not be empty",
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.batch_size",
                "0",
                "must be at least 1",
            ));
        }
        if self.visibility_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.visibility_timeout_seconds",
                "0",
                "must be at least 1",
            ));
        }
        if self.poll_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.poll_interval_seconds",
                "0",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Lenient parse of the delivery threshold; unset or unparsable means the default
pub fn parse_max_delivery_attempts(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return queue::DEFAULT_MAX_DELIVERY_ATTEMPTS;
    };

    match raw.trim().parse::<u32>() {
        Ok(value) => value,
        Err(e) => {
            warn!(
                value = %raw,
                error = %e,
                default = queue::DEFAULT_MAX_DELIVERY_ATTEMPTS,
                "Unable to parse max delivery attempts, using default"
            );
            queue::DEFAULT_MAX_DELIVERY_ATTEMPTS
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageSettings {
    Filesystem { root: PathBuf },
    Memory,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self::Filesystem {
            root: PathBuf::from("localdata/storage"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStreamSettings {
    /// e.g. `https://staging.prime.cdc.gov`; reports are written to
    /// `output_directory` when absent
    pub base_url: Option<String>,
    pub client_name: String,
    /// Partner whose `reportstream-private-key` secret signs token requests
    pub partner_id: String,
    pub scope: String,
    pub output_directory: PathBuf,
    pub request_timeout_seconds: u64,
}

impl Default for ReportStreamSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            client_name: "flexion.simulated-lab".to_string(),
            partner_id: partners::CA_PHL.to_string(),
            scope: "flexion.*.report".to_string(),
            output_directory: PathBuf::from("localdata"),
            request_timeout_seconds: 30,
        }
    }
}

impl ReportStreamSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerListSettings {
    pub known_ids: Vec<String>,
}

impl Default for PartnerListSettings {
    fn default() -> Self {
        Self {
            known_ids: vec![partners::CA_PHL.to_string(), partners::FLEXION.to_string()],
        }
    }
}
