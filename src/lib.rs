// DocScan - lib.rs
//
// Library entry point, exposing every module for integration testing and
// for front ends that embed the scan session controller.
//
// The `docscan` binary in `main.rs` is a thin headless driver over this
// library.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

pub use crate::app::artifact::{ArtifactStore, FileArtifactStore};
pub use crate::app::capability::{FileImportCapability, ScanCapability};
pub use crate::app::controller::{ProcessingHandle, ScanCompletion, SessionController};
pub use crate::core::model::{ArtifactLocation, ScanOutcome, ScanResult, ScanState};
pub use crate::core::notify::{NotificationChannel, Subscription};
