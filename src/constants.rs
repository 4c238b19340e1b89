//! # System Constants
//!
//! Storage layout, queue defaults and allow-lists that define the operational
//! boundaries of the ingestion service.

use std::time::Duration;

/// Well-known storage folders that signal a file's processing stage
pub mod folders {
    /// Single reports waiting to be forwarded; uploads here trigger a notification
    pub const IMPORT: &str = "import";
    /// Archives copied from a partner server, waiting to be extracted
    pub const UNZIP: &str = "unzip";
    /// Forwarded reports, and extracted archives under `unzip/`
    pub const SUCCESS: &str = "success";
    /// Rejected reports, archive error ledgers, and unreadable archives under `unzip/`
    pub const FAILURE: &str = "failure";
    /// Partner settings documents (`config/<partner>.json`)
    pub const CONFIG: &str = "config";
}

/// Queue consumer defaults
pub mod queue {
    use super::Duration;

    /// Delivery attempts allowed before a message is dead-lettered
    pub const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 5;
    /// Long enough to cover the worst-case processing of one message
    pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(15 * 60);
    /// Sleep between polls, regardless of the previous poll's outcome
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
    pub const DEFAULT_BATCH_SIZE: usize = 32;
    pub const DEFAULT_IMPORT_QUEUE: &str = "blob-message-queue";
    pub const DEFAULT_POLLING_QUEUE: &str = "polling-trigger-queue";
    pub const DEAD_LETTER_SUFFIX: &str = "-dead-letter";
}

/// Partner identifiers known to the service
pub mod partners {
    pub const CA_PHL: &str = "ca-phl";
    pub const FLEXION: &str = "flexion";
}

/// Environment name used when none is configured
pub const DEFAULT_ENVIRONMENT: &str = "local";

/// Environment whose ReportStream audience has no environment prefix
pub const PRODUCTION_ENVIRONMENT: &str = "prd";

/// Archive file extension that routes a transferred file to extraction
pub const ARCHIVE_EXTENSION: &str = ".zip";
