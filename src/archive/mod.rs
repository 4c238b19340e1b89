//! # Archive Handling
//!
//! Extraction of partner zip archives with a per-member error ledger.

pub mod errors;
mod extractor;
mod ledger;

pub use errors::{ArchiveError, ArchiveResult};
pub use extractor::{ArchiveExtractor, ArchiveMember, ArchiveOutcome};
pub use ledger::{ErrorLedger, FileError};
