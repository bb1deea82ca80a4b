// DocScan - util/constants.rs
//
// Single source of truth for named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "DocScan";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "DocScan";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Session messages
// =============================================================================

/// Status message set after the combined document was persisted.
pub const PDF_CREATED_MESSAGE: &str = "PDF created successfully";

/// Error message used when the capability fails without a description.
pub const UNKNOWN_SCAN_ERROR: &str = "Unknown error occurred during scanning";

/// Prefix for notifications about a failed attempt to open the artifact.
pub const OPEN_FAILED_PREFIX: &str = "Failed to open PDF";

// =============================================================================
// Scanner limits
// =============================================================================

/// Smallest accepted `[scanner] page_limit`.
pub const MIN_PAGE_LIMIT: u32 = 1;

/// Largest accepted `[scanner] page_limit`.
pub const MAX_PAGE_LIMIT: u32 = 100;

// =============================================================================
// Storage
// =============================================================================

/// File name of the single persisted artifact slot.
pub const DEFAULT_ARTIFACT_FILE_NAME: &str = "Scan.pdf";

/// Suffix appended to the slot file name for the in-progress copy.
pub const ARTIFACT_TEMP_SUFFIX: &str = ".tmp";

/// Name given to the background thread that persists a scan result.
pub const SAVE_WORKER_THREAD_NAME: &str = "docscan-save";

/// Name given to the background thread of the file-import capability.
pub const IMPORT_WORKER_THREAD_NAME: &str = "docscan-import";

/// Undelivered notifications buffered per subscriber. A newer message
/// replaces an unread older one.
pub const NOTIFICATION_CAPACITY: usize = 1;

// =============================================================================
// CLI
// =============================================================================

/// How long the CLI waits for a scan session to settle before giving up.
/// The controller itself never times out; this only bounds the headless driver.
pub const CLI_SESSION_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Logging
// =============================================================================

/// Default log level when neither RUST_LOG, --debug, nor config set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Levels accepted by `[logging] level`.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// =============================================================================
// File names
// =============================================================================

/// Configuration file name, looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
