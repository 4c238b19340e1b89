//! # Remote File Transfer Pipeline
//!
//! Copies every file in a partner's starting directory into blob storage.
//! Each file gets its own task; the pass waits for all of them before
//! returning so the caller can close the shared session safely. The remote
//! copy is only removed once the upload has succeeded.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::errors::{FileTransferError, TransferError, TransferResult};
use super::traits::{RemoteFileEntry, RemoteFileServer};
use crate::archive::{ArchiveError, ArchiveExtractor, ArchiveOutcome};
use crate::constants::ARCHIVE_EXTENSION;
use crate::secrets::{PartnerSecretNames, SecretStore};
use crate::storage::{paths, BlobStore};

/// A file that reached storage and was removed from the remote server
#[derive(Debug, Clone, PartialEq)]
pub struct CopiedFile {
    pub remote_path: String,
    pub blob_path: String,
    /// Extraction result, for archives only
    pub archive: Option<Result<ArchiveOutcome, ArchiveError>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileTransferOutcome {
    pub file_name: String,
    pub result: Result<CopiedFile, FileTransferError>,
}

/// Everything that happened during one `copy_files` pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferReport {
    pub directory: String,
    pub files: Vec<FileTransferOutcome>,
    pub skipped_directories: Vec<String>,
}

impl TransferReport {
    pub fn copied(&self) -> impl Iterator<Item = &CopiedFile> {
        self.files.iter().filter_map(|f| f.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FileTransferError)> {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().err().map(|e| (f.file_name.as_str(), e)))
    }

    pub fn copied_count(&self) -> usize {
        self.copied().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

#[derive(Clone)]
pub struct TransferPipeline {
    server: Arc<dyn RemoteFileServer>,
    store: Arc<dyn BlobStore>,
    secrets: Arc<dyn SecretStore>,
    extractor: Arc<ArchiveExtractor>,
    names: PartnerSecretNames,
}

impl std::fmt::Debug for TransferPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferPipeline")
            .field("partner_id", &self.names.partner_id())
            .finish()
    }
}

impl TransferPipeline {
    pub fn new(
        server: Arc<dyn RemoteFileServer>,
        store: Arc<dyn BlobStore>,
        secrets: Arc<dyn SecretStore>,
        extractor: Arc<ArchiveExtractor>,
        names: PartnerSecretNames,
    ) -> Self {
        Self {
            server,
            store,
            secrets,
            extractor,
            names,
        }
    }

    /// List the partner's starting directory and copy every file in it
    /// concurrently. Per-file failures land in the report; only failing to
    /// resolve or list the directory is an error.
    #[instrument(skip(self), fields(partner_id = %self.names.partner_id()))]
    pub async fn copy_files(&self) -> TransferResult<TransferReport> {
        let directory_secret = self.names.sftp_starting_directory();
        let directory = self
            .secrets
            .get_secret(&directory_secret)
            .await
            .map_err(|e| {
                error!(secret_name = %directory_secret, error = %e, "Unable to get starting directory");
                TransferError::secret(&directory_secret, e)
            })?
            .trim()
            .to_string();

        let entries = self.server.read_dir(&directory).await.map_err(|e| {
            error!(directory = %directory, error = %e, "Failed to read directory");
            e
        })?;

        info!(directory = %directory, entries = entries.len(), "Listed starting directory");

        let mut report = TransferReport {
            directory: directory.clone(),
            ..TransferReport::default()
        };

        let mut handles = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.is_dir {
                info!(file_name = %entry.name, "Skipping directory");
                report.skipped_directories.push(entry.name);
                continue;
            }

            let pipeline = self.clone();
            let dir = directory.clone();
            let file_name = entry.name.clone();
            let handle =
                tokio::spawn(async move { pipeline.copy_single_file(&entry, &dir).await });
            handles.push((file_name, handle));
        }

        for (file_name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(FileTransferError::Task {
                    file_name: file_name.clone(),
                    message: e.to_string(),
                }),
            };

            if let Err(e) = &result {
                error!(file_name = %file_name, error = %e, "File transfer failed");
            }
            report.files.push(FileTransferOutcome { file_name, result });
        }

        info!(
            copied = report.copied_count(),
            failed = report.failure_count(),
            "Finished copying files"
        );

        Ok(report)
    }

    /// Read one remote file, stage it, extract it when it is an archive,
    /// then remove the remote copy
    pub async fn copy_single_file(
        &self,
        entry: &RemoteFileEntry,
        directory: &str,
    ) -> Result<CopiedFile, FileTransferError> {
        let remote_path = format!("{}/{}", directory.trim_end_matches('/'), entry.name);
        info!(file_name = %remote_path, size = entry.size, "Considering file");

        let contents = self
            .server
            .read_file(&remote_path)
            .await
            .map_err(|source| FileTransferError::Read {
                path: remote_path.clone(),
                source,
            })?;

        let is_archive = is_archive(&entry.name);
        let blob_path = if is_archive {
            paths::unzip_path(&entry.name)
        } else {
            paths::import_path(&entry.name)
        };

        self.store
            .upload(&blob_path, &contents)
            .await
            .map_err(|source| FileTransferError::Upload {
                path: blob_path.clone(),
                source,
            })?;

        let archive = if is_archive {
            Some(self.extract_archive(&contents, &blob_path).await?)
        } else {
            None
        };

        self.server
            .remove(&remote_path)
            .await
            .map_err(|source| FileTransferError::Remove {
                path: remote_path.clone(),
                source,
            })?;

        info!(file_name = %remote_path, blob_path = %blob_path, "Copied file and removed it from the SFTP server");

        Ok(CopiedFile {
            remote_path,
            blob_path,
            archive,
        })
    }

    /// Extract from a local scratch copy. Only a scratch failure stops the
    /// file; extraction errors are reported and the archive stays staged.
    async fn extract_archive(
        &self,
        contents: &[u8],
        blob_path: &str,
    ) -> Result<Result<ArchiveOutcome, ArchiveError>, FileTransferError> {
        let scratch_error = |e: std::io::Error| FileTransferError::Scratch {
            path: blob_path.to_string(),
            message: e.to_string(),
        };

        let scratch = tempfile::Builder::new()
            .prefix("sftp-ingestion-")
            .suffix(ARCHIVE_EXTENSION)
            .tempfile()
            .map_err(scratch_error)?;
        tokio::fs::write(scratch.path(), contents)
            .await
            .map_err(scratch_error)?;

        let outcome = self.extractor.unzip(scratch.path(), blob_path).await;

        if let Err(e) = scratch.close() {
            warn!(blob_path = %blob_path, error = %e, "Failed to remove scratch file");
        }

        Ok(outcome)
    }
}

fn is_archive(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(ARCHIVE_EXTENSION)
}
