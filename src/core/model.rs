// DocScan - core/model.rs
//
// Core data types: the observable scan snapshot, the capability's raw result,
// and the reference types passed between the controller, the artifact store,
// and platform collaborators.
//
// `ScanState` is a value type. The controller never mutates a published
// snapshot; every transition builds a new one (usually with `..prev.clone()`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::util::error::CapabilityError;

// =============================================================================
// References
// =============================================================================

/// Opaque reference to one scanned page image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageRef(PathBuf);

impl PageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Reference to the capability's combined document (the source of a save).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(PathBuf);

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Where the persisted artifact lives. Handed to open/share collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    /// Absolute or data-dir-relative path of the artifact slot.
    pub path: PathBuf,
    /// Size of the persisted document in bytes.
    pub size_bytes: u64,
    /// Last modification time of the slot file.
    pub saved_at: DateTime<Utc>,
}

// =============================================================================
// Capability input/output
// =============================================================================

/// Scanner UI mode requested from the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerMode {
    /// Crop, rotate and reorder only.
    Base,
    /// Base mode plus image filters.
    BaseWithFilter,
    /// All editing features, including automatic cleanup.
    #[default]
    Full,
}

impl ScannerMode {
    /// Parse a config string (`"base"`, `"base_with_filter"`, `"full"`).
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Some(Self::Base),
            "base_with_filter" => Some(Self::BaseWithFilter),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Options handed to the capability with every scan request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerOptions {
    /// Maximum number of pages per scan. `None` = unlimited.
    pub page_limit: Option<u32>,
    /// Whether pages may be imported from existing images.
    pub allow_gallery_import: bool,
    /// Editing mode offered by the scanner UI.
    pub mode: ScannerMode,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            page_limit: None,
            allow_gallery_import: true,
            mode: ScannerMode::Full,
        }
    }
}

/// Request passed to `ScanCapability::begin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub options: ScannerOptions,
}

/// Raw output of one completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Page images, in scan order.
    pub pages: Vec<PageRef>,
    /// Combined document, if the capability produced one.
    pub document: Option<DocumentRef>,
    /// Page count reported alongside the combined document.
    pub page_count: Option<u32>,
}

/// Every way a scan can end, as delivered to `handle_scan_result`.
#[derive(Debug)]
pub enum ScanOutcome {
    Completed(ScanResult),
    /// The user backed out; not an error.
    Cancelled,
    Failed(CapabilityError),
}

// =============================================================================
// Observable snapshot
// =============================================================================

/// Snapshot of the scan session exposed to readers.
///
/// Invariants maintained by the controller:
/// - `artifact_uri.is_some()` implies `has_persisted_artifact` and an empty
///   `error_message`.
/// - A non-empty `error_message` implies `artifact_uri.is_none()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanState {
    /// Page images of the last successful scan, in page order.
    pub image_uris: Vec<PageRef>,
    pub has_persisted_artifact: bool,
    /// True strictly between `start_scan` and the arrival of its outcome.
    pub is_loading: bool,
    pub artifact_uri: Option<ArtifactLocation>,
    /// Sticky informational message.
    pub status_message: String,
    /// Sticky failure message.
    pub error_message: String,
}

/// Tagged view of a `ScanState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Loading,
    Success,
    Error,
}

impl ScanState {
    /// Collapse the flattened snapshot into its state-machine phase.
    ///
    /// Loading wins over everything else; an error wins over a stale success.
    pub fn phase(&self) -> ScanPhase {
        if self.is_loading {
            ScanPhase::Loading
        } else if !self.error_message.is_empty() {
            ScanPhase::Error
        } else if self.artifact_uri.is_some() || !self.image_uris.is_empty() {
            ScanPhase::Success
        } else {
            ScanPhase::Idle
        }
    }

    /// Check the cross-field invariants. Used by tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        let artifact_ok = self.artifact_uri.is_none()
            || (self.has_persisted_artifact && self.error_message.is_empty());
        let error_ok = self.error_message.is_empty() || self.artifact_uri.is_none();
        artifact_ok && error_ok
    }
}
