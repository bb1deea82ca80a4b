// DocScan - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Capability and persistence errors never cross the controller boundary as
// `Err`; the controller turns them into snapshot data. They still carry their
// causes so the log line written at that boundary is diagnosable.

use std::fmt;
use std::io;
use std::path::PathBuf;

use super::constants::UNKNOWN_SCAN_ERROR;

/// Top-level error type for DocScan operations outside the controller.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum DocScanError {
    /// The scan capability failed or produced nothing usable.
    Capability(CapabilityError),

    /// Copying the produced document into the artifact slot failed.
    Persistence(PersistenceError),

    /// Opening or sharing the persisted artifact failed.
    Consumption(ConsumptionError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for DocScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capability(e) => write!(f, "Scan error: {e}"),
            Self::Persistence(e) => write!(f, "Storage error: {e}"),
            Self::Consumption(e) => write!(f, "Open error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for DocScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Capability(e) => Some(e),
            Self::Persistence(e) => Some(e),
            Self::Consumption(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability errors
// ---------------------------------------------------------------------------

/// Errors reported by the external scan capability.
#[derive(Debug)]
pub enum CapabilityError {
    /// The scanner could not be started at all.
    LaunchFailed { reason: String },

    /// The scanner started but failed. `None` when it gave no description.
    Failed { message: Option<String> },

    /// The scanner returned neither pages nor a combined document.
    EmptyResult,

    /// More pages were supplied than the configured page limit allows.
    PageLimitExceeded { pages: usize, limit: u32 },

    /// An input the scanner was asked to import is not readable.
    MissingInput { path: PathBuf, source: io::Error },
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LaunchFailed { reason } => write!(f, "Scanner could not be started: {reason}"),
            Self::Failed { message } => {
                f.write_str(message.as_deref().unwrap_or(UNKNOWN_SCAN_ERROR))
            }
            Self::EmptyResult => f.write_str("Scanner returned no pages"),
            Self::PageLimitExceeded { pages, limit } => {
                write!(f, "Scan has {pages} pages, exceeds the limit of {limit}")
            }
            Self::MissingInput { path, source } => {
                write!(f, "Cannot read scan input '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for CapabilityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MissingInput { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<CapabilityError> for DocScanError {
    fn from(e: CapabilityError) -> Self {
        Self::Capability(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

/// Errors related to persisting the combined document into the artifact slot.
#[derive(Debug)]
pub enum PersistenceError {
    /// The scanned document could not be opened for reading.
    SourceUnreadable { path: PathBuf, source: io::Error },

    /// The slot directory or temp file could not be created.
    DestinationUnwritable { path: PathBuf, source: io::Error },

    /// Copying bytes from the document into the temp file failed.
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// The completed copy could not be moved over the slot.
    Finalise { path: PathBuf, source: io::Error },

    /// Storage backend failure with no path context. Displays as the bare
    /// underlying message.
    Backend(io::Error),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnreadable { path, source } => {
                write!(
                    f,
                    "Cannot read scanned document '{}': {source}",
                    path.display()
                )
            }
            Self::DestinationUnwritable { path, source } => {
                write!(f, "Cannot write artifact '{}': {source}", path.display())
            }
            Self::Copy { from, to, source } => write!(
                f,
                "Failed to copy '{}' to '{}': {source}",
                from.display(),
                to.display()
            ),
            Self::Finalise { path, source } => {
                write!(f, "Failed to finalise artifact '{}': {source}", path.display())
            }
            Self::Backend(source) => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceUnreadable { source, .. } => Some(source),
            Self::DestinationUnwritable { source, .. } => Some(source),
            Self::Copy { source, .. } => Some(source),
            Self::Finalise { source, .. } => Some(source),
            Self::Backend(source) => Some(source),
        }
    }
}

impl From<PersistenceError> for DocScanError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

// ---------------------------------------------------------------------------
// Consumption errors
// ---------------------------------------------------------------------------

/// Errors from handing the artifact to another application.
#[derive(Debug)]
pub enum ConsumptionError {
    /// No artifact has been persisted yet.
    NoArtifact,

    /// The OS helper program could not be started.
    Launch {
        program: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// No open helper exists for this platform.
    Unsupported,
}

impl fmt::Display for ConsumptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoArtifact => f.write_str("no scanned document has been saved yet"),
            Self::Launch {
                program,
                path,
                source,
            } => write!(
                f,
                "could not launch '{program}' for '{}': {source}",
                path.display()
            ),
            Self::Unsupported => f.write_str("opening documents is not supported on this platform"),
        }
    }
}

impl std::error::Error for ConsumptionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConsumptionError> for DocScanError {
    fn from(e: ConsumptionError) -> Self {
        Self::Consumption(e)
    }
}

/// Convenience type alias for DocScan results.
pub type Result<T> = std::result::Result<T, DocScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_without_message_uses_fallback() {
        let e = CapabilityError::Failed { message: None };
        assert_eq!(e.to_string(), UNKNOWN_SCAN_ERROR);

        let e = CapabilityError::Failed {
            message: Some("camera busy".to_string()),
        };
        assert_eq!(e.to_string(), "camera busy");
    }

    /// Backend errors must display as the bare message so the snapshot's
    /// error_message matches what the storage layer reported.
    #[test]
    fn test_backend_error_displays_bare_message() {
        let e = PersistenceError::Backend(io::Error::other("disk full"));
        assert_eq!(e.to_string(), "disk full");
    }

    #[test]
    fn test_top_level_error_preserves_source_chain() {
        use std::error::Error as _;
        let e: DocScanError = PersistenceError::SourceUnreadable {
            path: PathBuf::from("/tmp/in.pdf"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        }
        .into();
        let persistence = e.source().expect("persistence source");
        assert!(persistence.source().is_some(), "io cause must be kept");
    }
}
