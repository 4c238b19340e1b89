//! Configuration Loader
//!
//! Environment-aware loading: detects the environment, merges the layered
//! sources and validates the result.

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::IngestionConfig;
use crate::constants::DEFAULT_ENVIRONMENT;

/// Flat variables from older deployments, applied last
#[derive(Debug, Clone, Default)]
pub struct LegacyVariables {
    pub environment: Option<String>,
    pub max_delivery_attempts: Option<String>,
    pub queue_database_url: Option<String>,
    pub report_stream_url_prefix: Option<String>,
    pub report_stream_client_name: Option<String>,
}

impl LegacyVariables {
    pub fn from_env() -> Self {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            environment: read("ENV"),
            max_delivery_attempts: read("QUEUE_MAX_DELIVERY_ATTEMPTS"),
            queue_database_url: read("QUEUE_DATABASE_URL"),
            report_stream_url_prefix: read("REPORT_STREAM_URL_PREFIX"),
            report_stream_client_name: read("REPORT_STREAM_CLIENT_NAME"),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<IngestionConfig> {
        let legacy = LegacyVariables::from_env();
        let environment = Self::detect_environment(&legacy);
        Self::load_from_directory_with_env(&Self::default_config_directory(), &environment, &legacy)
    }

    /// Load from an explicit directory and environment without reading the
    /// flat legacy variables from the process
    pub fn load_from_directory_with_env(
        config_directory: &Path,
        environment: &str,
        legacy: &LegacyVariables,
    ) -> ConfigResult<IngestionConfig> {
        let env_file = config_directory.join(format!("{environment}.toml"));
        debug!(
            environment = %environment,
            config_file = %env_file.display(),
            "Loading configuration"
        );

        let load_error = |e: config::ConfigError| ConfigurationError::load_error(environment, e);

        let defaults = Config::try_from(&IngestionConfig::default()).map_err(load_error)?;

        let built = Config::builder()
            .add_source(defaults)
            .add_source(File::from(env_file).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("INGESTION")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override("environment", environment)
            .and_then(|b| {
                b.set_override_option("queue.max_delivery_attempts", legacy.max_delivery_attempts.clone())
            })
            .and_then(|b| b.set_override_option("queue.database_url", legacy.queue_database_url.clone()))
            .and_then(|b| {
                b.set_override_option(
                    "report_stream.base_url",
                    legacy.report_stream_url_prefix.clone(),
                )
            })
            .and_then(|b| {
                b.set_override_option(
                    "report_stream.client_name",
                    legacy.report_stream_client_name.clone(),
                )
            })
            .map_err(load_error)?
            .build()
            .map_err(load_error)?;

        let config: IngestionConfig = built.try_deserialize().map_err(load_error)?;
        config.validate()?;

        // Only non-sensitive fields are logged
        info!(
            environment = %config.environment,
            import_queue = %config.queue.import_queue,
            polling_queue = %config.queue.polling_queue,
            queue_backend = if config.queue.database_url.is_some() { "pgmq" } else { "in_memory" },
            report_stream_enabled = config.report_stream.base_url.is_some(),
            partners = config.partners.known_ids.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// `ENV`, defaulting to `local`
    pub fn detect_environment(legacy: &LegacyVariables) -> String {
        legacy
            .environment
            .clone()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var("INGESTION_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}
