// DocScan - tests/e2e_session.rs
//
// End-to-end tests for a scan session: real filesystem, real artifact slot,
// real background threads. The only stand-in is the capability, which is
// either the file-import capability or a counting wrapper around it.

use docscan::app::artifact::{ArtifactStore, FileArtifactStore};
use docscan::app::capability::{FileImportCapability, ScanCapability};
use docscan::app::controller::{ScanCompletion, SessionController};
use docscan::core::model::{
    DocumentRef, ScanOutcome, ScanPhase, ScanRequest, ScanResult, ScanState, ScannerOptions,
};
use docscan::core::notify::NotificationChannel;
use docscan::util::constants::PDF_CREATED_MESSAGE;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

const SETTLE: Duration = Duration::from_secs(10);

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tmpdir"),
        }
    }

    fn file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join("capability").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn store(&self) -> Arc<FileArtifactStore> {
        Arc::new(FileArtifactStore::new(
            &self.dir.path().join("data"),
            "Scan.pdf",
        ))
    }

    fn slot(&self) -> PathBuf {
        self.dir.path().join("data").join("Scan.pdf")
    }
}

fn controller(
    store: Arc<FileArtifactStore>,
    capability: Arc<dyn ScanCapability>,
) -> SessionController {
    SessionController::new(
        store,
        NotificationChannel::new(),
        capability,
        ScannerOptions::default(),
    )
}

/// Start a session and wait for it to settle.
fn run_session(controller: &SessionController) -> Arc<ScanState> {
    assert!(controller.start_scan(), "session should start");
    controller
        .watch()
        .wait_until(|s| !s.is_loading, SETTLE)
        .expect("session should settle")
}

fn read(path: &Path) -> Vec<u8> {
    fs::read(path).expect("read")
}

// =============================================================================
// Full sessions
// =============================================================================

/// A scan with three pages and a combined document ends in the success
/// snapshot with the document copied into the slot.
#[test]
fn e2e_import_persists_document_and_reports_success() {
    let fx = Fixture::new();
    let pages: Vec<PathBuf> = ["p1.jpg", "p2.jpg", "p3.jpg"]
        .iter()
        .map(|n| fx.file(n, n.as_bytes()))
        .collect();
    let doc = fx.file("d1.pdf", b"%PDF-1.7 three pages");
    let store = fx.store();
    let controller = controller(
        store.clone(),
        Arc::new(FileImportCapability::new(pages.clone(), Some(doc))),
    );
    let mut notifications = controller.notifications();

    let state = run_session(&controller);

    assert_eq!(state.phase(), ScanPhase::Success);
    let got: Vec<PathBuf> = state.image_uris.iter().map(|p| p.path().to_path_buf()).collect();
    assert_eq!(got, pages);
    assert!(state.has_persisted_artifact);
    assert_eq!(state.status_message, PDF_CREATED_MESSAGE);
    assert_eq!(state.error_message, "");

    let location = state.artifact_uri.clone().expect("artifact location");
    assert_eq!(location.path, fx.slot());
    assert_eq!(location.size_bytes, 20);
    assert_eq!(read(&fx.slot()), b"%PDF-1.7 three pages");
    assert!(store.exists());
    assert_eq!(store.locate().map(|l| l.path), Some(fx.slot()));
    assert_eq!(notifications.try_recv(), None, "success sends no notification");
}

/// A capability failure leaves a reusable, consistent error snapshot and
/// sends the message once.
#[test]
fn e2e_missing_input_is_reported_as_error() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("capability").join("gone.pdf");
    let controller = controller(
        fx.store(),
        Arc::new(FileImportCapability::new(Vec::new(), Some(missing))),
    );
    let mut notifications = controller.notifications();

    let state = run_session(&controller);

    assert_eq!(state.phase(), ScanPhase::Error);
    assert!(state.error_message.contains("gone.pdf"), "{}", state.error_message);
    assert!(state.artifact_uri.is_none());
    assert!(state.is_consistent());
    assert_eq!(
        notifications.recv_timeout(SETTLE).as_deref(),
        Some(state.error_message.as_str())
    );
    assert!(!fx.slot().exists());
}

/// Two sessions in a row leave exactly the second document in the slot, and
/// reset returns to the default snapshot in between.
#[test]
fn e2e_second_session_replaces_artifact() {
    let fx = Fixture::new();
    let store = fx.store();

    let first = fx.file("first.pdf", b"first document with more bytes");
    let c1 = controller(
        store.clone(),
        Arc::new(FileImportCapability::new(Vec::new(), Some(first))),
    );
    run_session(&c1);
    c1.reset_state();
    assert_eq!(*c1.snapshot(), ScanState::default());

    let second = fx.file("second.pdf", b"second");
    let c2 = controller(
        store.clone(),
        Arc::new(FileImportCapability::new(Vec::new(), Some(second))),
    );
    let state = run_session(&c2);

    assert!(state.has_persisted_artifact);
    assert_eq!(read(&fx.slot()), b"second");
    assert!(store.exists());
}

/// A failed save must not destroy the previous artifact.
#[test]
fn e2e_failed_save_keeps_previous_artifact() {
    let fx = Fixture::new();
    let store = fx.store();
    let good = fx.file("good.pdf", b"good");
    run_session(&controller(
        store.clone(),
        Arc::new(FileImportCapability::new(Vec::new(), Some(good))),
    ));

    // The capability reports a document that no longer exists by the time
    // the controller tries to copy it.
    let vanished = fx.dir.path().join("capability").join("vanished.pdf");
    let controller = controller(store.clone(), Arc::new(ParkingCapability::default()));
    let mut notifications = controller.notifications();
    controller
        .handle_scan_result(ScanOutcome::Completed(ScanResult {
            pages: Vec::new(),
            document: Some(DocumentRef::new(vanished)),
            page_count: None,
        }))
        .wait();

    let state = controller.snapshot();
    assert_eq!(state.phase(), ScanPhase::Error);
    assert!(!state.has_persisted_artifact);
    assert!(state.artifact_uri.is_none());
    assert_eq!(
        notifications.try_recv().as_deref(),
        Some(state.error_message.as_str())
    );
    assert_eq!(read(&fx.slot()), b"good", "previous artifact must survive");
    assert!(store.exists());
}

// =============================================================================
// Concurrency and lifecycle
// =============================================================================

/// Capability that counts launches and parks each completion until released.
#[derive(Default)]
struct ParkingCapability {
    launches: AtomicUsize,
    parked: std::sync::Mutex<Vec<ScanCompletion>>,
}

impl ScanCapability for ParkingCapability {
    fn begin(&self, _request: ScanRequest, completion: ScanCompletion) {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.parked.lock().unwrap().push(completion);
    }
}

/// Many threads racing to start a scan launch the capability exactly once.
#[test]
fn e2e_concurrent_start_launches_once() {
    let fx = Fixture::new();
    let capability = Arc::new(ParkingCapability::default());
    let controller = controller(fx.store(), capability.clone());

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let controller = controller.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                controller.start_scan()
            })
        })
        .collect();
    let started = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|started| *started)
        .count();

    assert_eq!(started, 1);
    assert_eq!(capability.launches.load(Ordering::SeqCst), 1);
    assert!(controller.snapshot().is_loading);

    // Cancelling releases the gate for the next session.
    let completion = capability.parked.lock().unwrap().pop().unwrap();
    completion.complete(ScanOutcome::Cancelled).wait();
    assert!(!controller.snapshot().is_loading);
    assert!(controller.start_scan());
    assert_eq!(capability.launches.load(Ordering::SeqCst), 2);
}

/// A reader attached mid-session sees the latest snapshot immediately and is
/// woken by the final transition.
#[test]
fn e2e_late_reader_sees_latest_then_result() {
    let fx = Fixture::new();
    let doc = fx.file("late.pdf", b"late");
    let capability = Arc::new(ParkingCapability::default());
    let controller = controller(fx.store(), capability.clone());

    controller.start_scan();
    let mut late = controller.watch();
    assert!(late.current().is_loading);
    assert!(!late.has_changed());

    let completion = capability.parked.lock().unwrap().pop().unwrap();
    let handle = completion.complete(ScanOutcome::Completed(ScanResult {
        pages: Vec::new(),
        document: Some(DocumentRef::new(doc)),
        page_count: Some(1),
    }));

    let state = late
        .wait_until(|s| !s.is_loading, SETTLE)
        .expect("final snapshot");
    handle.wait();
    assert_eq!(state.phase(), ScanPhase::Success);
}

/// Resetting mid-session abandons it: its late result neither saves a
/// document nor ends the session started afterwards.
#[test]
fn e2e_reset_abandons_in_flight_session() {
    let fx = Fixture::new();
    let doc = fx.file("abandoned.pdf", b"abandoned");
    let capability = Arc::new(ParkingCapability::default());
    let controller = controller(fx.store(), capability.clone());

    assert!(controller.start_scan());
    let abandoned = capability.parked.lock().unwrap().pop().unwrap();
    controller.reset_state();
    assert!(controller.start_scan());

    abandoned
        .complete(ScanOutcome::Completed(ScanResult {
            pages: Vec::new(),
            document: Some(DocumentRef::new(doc)),
            page_count: None,
        }))
        .wait();

    assert!(controller.snapshot().is_loading);
    assert!(!fx.slot().exists(), "abandoned document must not be saved");
    assert!(!controller.start_scan());
    assert_eq!(capability.launches.load(Ordering::SeqCst), 2);
}

/// Notifications are not replayed to late subscribers.
#[test]
fn e2e_notifications_are_not_replayed() {
    let fx = Fixture::new();
    let controller = controller(fx.store(), Arc::new(ParkingCapability::default()));

    controller.publish_notification("A");
    let mut subscriber = controller.notifications();
    controller.publish_notification("B");

    assert_eq!(subscriber.try_recv().as_deref(), Some("B"));
    assert_eq!(subscriber.try_recv(), None);
}

/// Disabling gallery import turns the file-import capability into a launch
/// failure; the controller stays reusable.
#[test]
fn e2e_disabled_import_fails_cleanly() {
    let fx = Fixture::new();
    let doc = fx.file("doc.pdf", b"doc");
    let controller = SessionController::new(
        fx.store(),
        NotificationChannel::new(),
        Arc::new(FileImportCapability::new(Vec::new(), Some(doc))),
        ScannerOptions {
            allow_gallery_import: false,
            ..Default::default()
        },
    );

    let state = run_session(&controller);
    assert_eq!(state.phase(), ScanPhase::Error);
    assert!(!fx.slot().exists());

    controller.reset_state();
    assert!(controller.start_scan(), "controller must be reusable");
}
