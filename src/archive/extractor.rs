//! # Archive Extractor
//!
//! Unpacks a staged, possibly password-protected zip archive into the
//! `import` folder. A bad member is written to the error ledger and skipped;
//! only failures that affect the whole archive are returned as errors.

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use zip::ZipArchive;

use super::errors::{ArchiveError, ArchiveResult};
use super::ledger::{ErrorLedger, FileError};
use crate::secrets::SecretStore;
use crate::storage::{paths, BlobStore};

/// One decompressed archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub name: String,
    pub encrypted: bool,
    pub contents: Vec<u8>,
}

/// Result of a completed extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    /// Storage paths written under `import/`
    pub uploaded: Vec<String>,
    pub ledger: ErrorLedger,
    /// Where the ledger was written, when it was non-empty
    pub ledger_path: Option<String>,
}

pub struct ArchiveExtractor {
    store: Arc<dyn BlobStore>,
    secrets: Arc<dyn SecretStore>,
    /// Secret holding the partner's zip password; `None` when the partner
    /// does not use one
    password_secret: Option<String>,
}

impl std::fmt::Debug for ArchiveExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveExtractor")
            .field("password_secret", &self.password_secret)
            .finish()
    }
}

impl ArchiveExtractor {
    pub fn new(
        store: Arc<dyn BlobStore>,
        secrets: Arc<dyn SecretStore>,
        password_secret: Option<String>,
    ) -> Self {
        Self {
            store,
            secrets,
            password_secret,
        }
    }

    /// Extract `archive_path` (a local scratch copy) whose staged original
    /// lives at `original_blob_path`, then move the staged original to
    /// `unzip/success/` or `unzip/failure/`.
    #[instrument(skip(self), fields(archive = %original_blob_path))]
    pub async fn unzip(
        &self,
        archive_path: &Path,
        original_blob_path: &str,
    ) -> ArchiveResult<ArchiveOutcome> {
        let result = self.extract_all(archive_path, original_blob_path).await;

        if let Err(e) = &result {
            error!(error = %e, "Failed to unzip archive");
        }
        self.move_archive(original_blob_path, result.is_ok()).await;

        result
    }

    async fn extract_all(
        &self,
        archive_path: &Path,
        original_blob_path: &str,
    ) -> ArchiveResult<ArchiveOutcome> {
        let password = self.resolve_password().await?;

        // Reading, decompression and decryption are CPU bound
        let scratch = archive_path.to_path_buf();
        let archive = original_blob_path.to_string();
        let members = tokio::task::spawn_blocking(move || {
            let bytes =
                std::fs::read(&scratch).map_err(|e| ArchiveError::open(&archive, e.to_string()))?;
            read_members(bytes, password.as_deref())
                .map_err(|e| ArchiveError::open(&archive, e.to_string()))
        })
        .await
        .map_err(|e| ArchiveError::Task {
            archive: original_blob_path.to_string(),
            message: e.to_string(),
        })??;

        let mut ledger = ErrorLedger::new();
        let mut uploaded = Vec::new();

        for member in members {
            if let Some(path) = self.upload_single_file(member, &mut ledger).await {
                uploaded.push(path);
            }
        }

        let archive_name = paths::file_name(original_blob_path);
        let ledger_path = self.upload_error_list(archive_name, &ledger).await?;

        info!(
            uploaded = uploaded.len(),
            failed = ledger.len(),
            "Finished extracting archive"
        );

        Ok(ArchiveOutcome {
            uploaded,
            ledger,
            ledger_path,
        })
    }

    async fn resolve_password(&self) -> ArchiveResult<Option<String>> {
        match &self.password_secret {
            Some(name) => Ok(Some(self.secrets.get_secret(name).await?)),
            None => Ok(None),
        }
    }

    /// Upload one extracted member to `import/<base name>`. Returns the
    /// upload path, or `None` when the member was skipped or failed.
    async fn upload_single_file(
        &self,
        member: Result<Option<ArchiveMember>, FileError>,
        ledger: &mut ErrorLedger,
    ) -> Option<String> {
        let member = match member {
            Ok(Some(member)) => member,
            Ok(None) => return None,
            Err(e) => {
                warn!(file_name = %e.file_name, error = %e.message, "Failed to extract archive member");
                ledger.record(e);
                return None;
            }
        };

        let destination = paths::import_path(paths::file_name(&member.name));
        match self.store.upload(&destination, &member.contents).await {
            Ok(()) => {
                debug!(
                    file_name = %member.name,
                    destination = %destination,
                    encrypted = member.encrypted,
                    "Uploaded archive member"
                );
                Some(destination)
            }
            Err(e) => {
                warn!(file_name = %member.name, error = %e, "Failed to upload archive member");
                ledger.record(FileError::new(member.name, e));
                None
            }
        }
    }

    /// Write the ledger to `failure/<archive name>.txt` when anything failed
    async fn upload_error_list(
        &self,
        archive_name: &str,
        ledger: &ErrorLedger,
    ) -> ArchiveResult<Option<String>> {
        if ledger.is_empty() {
            return Ok(None);
        }

        let path = paths::error_ledger_path(archive_name);
        self.store
            .upload(&path, ledger.render().as_bytes())
            .await
            .map_err(|source| ArchiveError::LedgerUpload {
                path: path.clone(),
                source,
            })?;

        info!(path = %path, failures = ledger.len(), "Uploaded archive error ledger");
        Ok(Some(path))
    }

    async fn move_archive(&self, original_blob_path: &str, succeeded: bool) {
        let destination = paths::archive_outcome_path(original_blob_path, succeeded);
        if let Err(e) = self.store.move_blob(original_blob_path, &destination).await {
            error!(
                error = %e,
                source = %original_blob_path,
                destination = %destination,
                "Failed to move processed archive"
            );
        }
    }
}

/// Decompress every member of an archive, in archive order. Blocking.
pub fn read_members(
    bytes: Vec<u8>,
    password: Option<&str>,
) -> zip::result::ZipResult<Vec<Result<Option<ArchiveMember>, FileError>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    Ok((0..archive.len())
        .map(|index| read_member(&mut archive, index, password))
        .collect())
}

/// Decompress (and decrypt) a single member. Directories yield `Ok(None)`.
fn read_member(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    index: usize,
    password: Option<&str>,
) -> Result<Option<ArchiveMember>, FileError> {
    let (name, encrypted, is_dir) = {
        let raw = archive
            .by_index_raw(index)
            .map_err(|e| FileError::new(format!("#{index}"), e))?;
        (raw.name().to_string(), raw.encrypted(), raw.is_dir())
    };

    if is_dir {
        return Ok(None);
    }

    let mut file = match (encrypted, password) {
        (true, Some(password)) => archive.by_index_decrypt(index, password.as_bytes()),
        _ => archive.by_index(index),
    }
    .map_err(|e| FileError::new(&name, e))?;

    let mut contents = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
    file.read_to_end(&mut contents)
        .map_err(|e| FileError::new(&name, e))?;

    Ok(Some(ArchiveMember {
        name,
        encrypted,
        contents,
    }))
}
