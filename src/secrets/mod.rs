//! # Secret Store
//!
//! Credential lookup behind a capability trait. Which provider backs it is an
//! explicit configuration value ([`SecretStoreKind`]) handed to
//! [`build_secret_store`], so nothing reads the environment to decide.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod errors;
mod names;
mod providers;

pub use errors::{SecretError, SecretResult};
pub use names::PartnerSecretNames;
pub use providers::{EnvironmentSecretStore, InMemorySecretStore, LocalSecretStore};

#[async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Look up a secret by name. Implementations must not log the value.
    async fn get_secret(&self, name: &str) -> SecretResult<String>;

    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretStoreKind {
    /// `<directory>/<name>.pem` files
    Local { directory: PathBuf },
    /// Process environment variables
    Environment,
}

impl Default for SecretStoreKind {
    fn default() -> Self {
        Self::Local {
            directory: PathBuf::from("mock_credentials"),
        }
    }
}

pub fn build_secret_store(kind: &SecretStoreKind) -> Arc<dyn SecretStore> {
    match kind {
        SecretStoreKind::Local { directory } => Arc::new(LocalSecretStore::new(directory.clone())),
        SecretStoreKind::Environment => Arc::new(EnvironmentSecretStore::new()),
    }
}
