// DocScan - app/capability.rs
//
// The scan capability seam, plus a local implementation that "scans" by
// importing files that already exist on disk.
//
// Architecture:
//   - `SessionController::start_scan` calls `ScanCapability::begin` once per
//     session and hands over a one-shot `ScanCompletion`.
//   - The capability owns its own threading and timeouts; the controller
//     only waits for the completion (or its drop, which counts as cancel).
//   - `FileImportCapability` validates its inputs on a background thread so
//     `begin` never blocks the caller on filesystem access.

use crate::app::controller::ScanCompletion;
use crate::core::model::{DocumentRef, PageRef, ScanOutcome, ScanRequest, ScanResult};
use crate::util::constants::IMPORT_WORKER_THREAD_NAME;
use crate::util::error::CapabilityError;
use std::fs;
use std::path::PathBuf;
use std::thread;

/// External component that performs the actual scan.
pub trait ScanCapability: Send + Sync {
    /// Start a scan. The outcome must be delivered through `completion`,
    /// from any thread, exactly once; dropping it means "cancelled".
    fn begin(&self, request: ScanRequest, completion: ScanCompletion);
}

// =============================================================================
// File import
// =============================================================================

/// Capability that produces a scan result from existing page images and an
/// existing combined PDF.
#[derive(Debug, Clone)]
pub struct FileImportCapability {
    pages: Vec<PathBuf>,
    document: Option<PathBuf>,
}

impl FileImportCapability {
    pub fn new(pages: Vec<PathBuf>, document: Option<PathBuf>) -> Self {
        Self { pages, document }
    }

    /// Validate the inputs against the request and build the outcome.
    fn import(&self, request: &ScanRequest) -> ScanOutcome {
        if !request.options.allow_gallery_import {
            return ScanOutcome::Failed(CapabilityError::LaunchFailed {
                reason: "importing existing files is disabled ([scanner] gallery_import = false)"
                    .to_string(),
            });
        }

        if let Some(limit) = request.options.page_limit {
            if self.pages.len() > limit as usize {
                return ScanOutcome::Failed(CapabilityError::PageLimitExceeded {
                    pages: self.pages.len(),
                    limit,
                });
            }
        }

        for path in self.pages.iter().chain(self.document.iter()) {
            match fs::metadata(path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    return ScanOutcome::Failed(CapabilityError::MissingInput {
                        path: path.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            "not a regular file",
                        ),
                    })
                }
                Err(e) => {
                    return ScanOutcome::Failed(CapabilityError::MissingInput {
                        path: path.clone(),
                        source: e,
                    })
                }
            }
        }

        let pages: Vec<PageRef> = self.pages.iter().cloned().map(PageRef::new).collect();
        let page_count = self
            .document
            .as_ref()
            .map(|_| u32::try_from(pages.len()).unwrap_or(u32::MAX));

        tracing::debug!(
            pages = pages.len(),
            document = self.document.is_some(),
            mode = ?request.options.mode,
            "Files imported as scan"
        );

        ScanOutcome::Completed(ScanResult {
            pages,
            document: self.document.clone().map(DocumentRef::new),
            page_count,
        })
    }
}

impl ScanCapability for FileImportCapability {
    fn begin(&self, request: ScanRequest, completion: ScanCompletion) {
        let this = self.clone();
        let spawned = thread::Builder::new()
            .name(IMPORT_WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let outcome = this.import(&request);
                // Persistence is already off the caller's thread; wait for it
                // so the import thread's lifetime covers the whole session.
                completion.complete(outcome).wait();
            });

        // On spawn failure the closure (and the completion inside it) is
        // dropped, which the controller treats as a cancellation.
        if let Err(e) = spawned {
            tracing::error!(error = %e, "Cannot spawn import thread");
        }
    }
}

// =============================================================================
// Unit tests
// =============================================================================
