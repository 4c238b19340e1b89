//! # Partner Configuration
//!
//! Per-partner settings documents stored at `config/<partner>.json`. They are
//! loaded once at process start into an explicit [`PartnerConfigs`] map that
//! is handed to whoever needs it. A partner whose document is missing or
//! invalid is left out of the map rather than failing the process.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::storage::{paths, BlobStore};

/// Text encodings partners may declare for their reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "ISO-8859-1")]
    Iso88591,
    #[serde(rename = "UTF-8")]
    Utf8,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Iso88591 => write!(f, "ISO-8859-1"),
            TextEncoding::Utf8 => write!(f, "UTF-8"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerSettings {
    pub display_name: String,
    pub is_active: bool,
    pub is_external_sftp_connection: bool,
    pub has_zip_password: bool,
    pub default_encoding: TextEncoding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartnerConfig {
    pub partner_id: String,
    pub settings: PartnerSettings,
    pub last_retrieved: DateTime<Utc>,
}

impl PartnerConfig {
    pub fn new(partner_id: impl Into<String>, settings: PartnerSettings) -> Self {
        Self {
            partner_id: partner_id.into(),
            settings,
            last_retrieved: Utc::now(),
        }
    }

    /// Parse a settings document; unknown encodings are rejected here
    pub fn from_json(partner_id: &str, contents: &[u8]) -> Result<Self, PartnerConfigError> {
        let settings: PartnerSettings = serde_json::from_slice(contents)
            .map_err(|e| PartnerConfigError::invalid(partner_id, e.to_string()))?;
        Ok(Self::new(partner_id, settings))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartnerConfigError {
    #[error("Unknown partner '{partner_id}'")]
    UnknownPartner { partner_id: String },

    #[error("Failed to retrieve settings for partner '{partner_id}': {message}")]
    Retrieval { partner_id: String, message: String },

    #[error("Invalid settings for partner '{partner_id}': {message}")]
    Invalid { partner_id: String, message: String },
}

impl PartnerConfigError {
    pub fn unknown_partner(partner_id: impl Into<String>) -> Self {
        Self::UnknownPartner {
            partner_id: partner_id.into(),
        }
    }

    pub fn retrieval(partner_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            partner_id: partner_id.into(),
            message: message.into(),
        }
    }

    pub fn invalid(partner_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            partner_id: partner_id.into(),
            message: message.into(),
        }
    }
}

/// Partner id -> loaded configuration
#[derive(Debug, Clone, Default)]
pub struct PartnerConfigs {
    configs: HashMap<String, PartnerConfig>,
}

impl PartnerConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, config: PartnerConfig) {
        self.configs.insert(config.partner_id.clone(), config);
    }

    pub fn with_partner(mut self, partner_id: &str, settings: PartnerSettings) -> Self {
        self.insert(PartnerConfig::new(partner_id, settings));
        self
    }

    pub fn get(&self, partner_id: &str) -> Result<&PartnerConfig, PartnerConfigError> {
        self.configs
            .get(partner_id)
            .ok_or_else(|| PartnerConfigError::unknown_partner(partner_id))
    }

    pub fn contains(&self, partner_id: &str) -> bool {
        self.configs.contains_key(partner_id)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Fetch and parse `config/<partner_id>.json`
pub async fn load_partner_config(
    store: &dyn BlobStore,
    partner_id: &str,
) -> Result<PartnerConfig, PartnerConfigError> {
    let path = paths::partner_config_path(partner_id);
    let contents = store
        .fetch(&path)
        .await
        .map_err(|e| PartnerConfigError::retrieval(partner_id, e.to_string()))?;

    PartnerConfig::from_json(partner_id, &contents)
}

/// Load every known partner, leaving out the ones that fail
pub async fn load_partner_configs(store: &dyn BlobStore, partner_ids: &[String]) -> PartnerConfigs {
    let mut configs = PartnerConfigs::new();

    for partner_id in partner_ids {
        match load_partner_config(store, partner_id).await {
            Ok(config) => {
                info!(
                    partner_id = %partner_id,
                    display_name = %config.settings.display_name,
                    is_active = config.settings.is_active,
                    "Loaded partner settings"
                );
                configs.insert(config);
            }
            Err(e) => {
                error!(partner_id = %partner_id, error = %e, "Failed to load partner settings");
            }
        }
    }

    configs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBlobStore;

    const VALID: &str = r#"{
        "displayName": "California Public Health Lab",
        "isActive": true,
        "isExternalSftpConnection": true,
        "hasZipPassword": true,
        "defaultEncoding": "ISO-8859-1"
    }"#;

    #[test]
    fn test_parses_camel_case_settings() {
        let config = PartnerConfig::from_json("ca-phl", VALID.as_bytes()).unwrap();

        assert_eq!(config.partner_id, "ca-phl");
        assert!(config.settings.is_active);
        assert!(config.settings.has_zip_password);
        assert_eq!(config.settings.default_encoding, TextEncoding::Iso88591);
    }

    #[test]
    fn test_rejects_unlisted_encoding() {
        let contents = VALID.replace("ISO-8859-1", "UTF-16");
        let result = PartnerConfig::from_json("ca-phl", contents.as_bytes());

        assert!(matches!(result, Err(PartnerConfigError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_failed_partners_are_absent() {
        let store = InMemoryBlobStore::new();
        store.insert("config/ca-phl.json", VALID.as_bytes().to_vec());
        store.insert("config/flexion.json", b"{not json".to_vec());

        let ids = vec![
            "ca-phl".to_string(),
            "flexion".to_string(),
            "missing".to_string(),
        ];
        let configs = load_partner_configs(&store, &ids).await;

        assert_eq!(configs.len(), 1);
        assert!(configs.get("ca-phl").is_ok());
        assert_eq!(
            configs.get("flexion").unwrap_err(),
            PartnerConfigError::unknown_partner("flexion")
        );
    }
}
