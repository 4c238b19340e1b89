//! Secret store providers.

use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;

use super::errors::{SecretError, SecretResult};
use super::SecretStore;

/// Reads `<directory>/<name>.pem` files, used for local development
#[derive(Debug, Clone)]
pub struct LocalSecretStore {
    directory: PathBuf,
}

impl LocalSecretStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl SecretStore for LocalSecretStore {
    async fn get_secret(&self, name: &str) -> SecretResult<String> {
        if name.contains('/') || name.contains("..") {
            return Err(SecretError::read(name, "invalid secret name"));
        }

        let path = self.directory.join(format!("{name}.pem"));
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SecretError::not_found(name),
                _ => SecretError::read(name, e.to_string()),
            })?;

        non_empty(name, contents)
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}

/// Reads process environment variables: `ca-phl-sftp-user-prd` -> `CA_PHL_SFTP_USER_PRD`
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSecretStore;

impl EnvironmentSecretStore {
    pub fn new() -> Self {
        Self
    }

    pub fn variable_name(name: &str) -> String {
        name.to_uppercase().replace(['-', '.'], "_")
    }
}

#[async_trait]
impl SecretStore for EnvironmentSecretStore {
    async fn get_secret(&self, name: &str) -> SecretResult<String> {
        let variable = Self::variable_name(name);
        let value = std::env::var(&variable).map_err(|e| match e {
            std::env::VarError::NotPresent => SecretError::not_found(name),
            std::env::VarError::NotUnicode(_) => SecretError::read(name, "value is not unicode"),
        })?;

        non_empty(name, value)
    }

    fn provider_name(&self) -> &'static str {
        "environment"
    }
}

/// Secrets held in memory (for testing)
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<String, String>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(name.into(), value.into());
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret(&self, name: &str) -> SecretResult<String> {
        let value = self
            .secrets
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| SecretError::not_found(name))?;

        non_empty(name, value)
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

fn non_empty(name: &str, value: String) -> SecretResult<String> {
    if value.trim().is_empty() {
        Err(SecretError::empty(name))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_reads_pem_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("flexion-sftp-user-local.pem"), "lab-user").unwrap();

        let store = LocalSecretStore::new(dir.path());

        assert_eq!(
            store.get_secret("flexion-sftp-user-local").await.unwrap(),
            "lab-user"
        );
        assert_eq!(
            store.get_secret("flexion-zip-password-local").await,
            Err(SecretError::not_found("flexion-zip-password-local"))
        );
    }

    #[tokio::test]
    async fn test_local_store_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSecretStore::new(dir.path());

        assert!(matches!(
            store.get_secret("../etc/passwd").await,
            Err(SecretError::Read { .. })
        ));
    }

    #[test]
    fn test_environment_variable_name() {
        assert_eq!(
            EnvironmentSecretStore::variable_name("ca-phl-sftp-user-prd"),
            "CA_PHL_SFTP_USER_PRD"
        );
    }

    #[tokio::test]
    async fn test_environment_store_missing_variable() {
        let store = EnvironmentSecretStore::new();
        let result = store
            .get_secret("sftp-ingestion-test-unset-secret-name")
            .await;
        assert!(matches!(result, Err(SecretError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_in_memory_store_rejects_empty_values() {
        let store = InMemorySecretStore::new()
            .with_secret("a", "value")
            .with_secret("b", "   ");

        assert_eq!(store.get_secret("a").await.unwrap(), "value");
        assert_eq!(store.get_secret("b").await, Err(SecretError::empty("b")));
    }
}
