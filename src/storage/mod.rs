//! # Blob Storage
//!
//! Durable staging area for transferred files, extracted archive members,
//! error ledgers and partner settings.

pub mod errors;
mod filesystem;
mod memory;
pub mod paths;
mod traits;

pub use errors::{StorageError, StorageResult};
pub use filesystem::FilesystemBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;

use std::sync::Arc;

use crate::config::StorageSettings;

pub fn build_blob_store(settings: &StorageSettings) -> Arc<dyn BlobStore> {
    match settings {
        StorageSettings::Filesystem { root } => Arc::new(FilesystemBlobStore::new(root.clone())),
        StorageSettings::Memory => Arc::new(InMemoryBlobStore::new()),
    }
}
