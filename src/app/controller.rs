// DocScan - app/controller.rs
//
// Scan session lifecycle. Single writer of the `ScanState` snapshot; drives
// the artifact store and the notification channel.
//
// Architecture:
//   - `SessionController` is a cheap clone around shared state so the UI and
//     the save worker can both hold it. A `ScanCompletion` holds only a weak
//     reference, so a capability that parks its completion does not keep a
//     dropped controller alive.
//   - Every transition goes through `StateWriter::transition`, which checks
//     and replaces the snapshot under one lock. That makes the
//     reject-if-loading guard in `start_scan` race-free.
//   - Each `start_scan` and `reset_state` opens a new session id inside its
//     transition. Completions and save workers carry the id they were issued
//     for; an outcome for a superseded session is logged and dropped.
//   - Persisting a combined document is blocking I/O and runs on a named
//     background thread. Its outcome is reported only as a later transition
//     (and, for failures, one notification); nothing is returned as `Err`.
//
// State machine (collapsed into the flattened snapshot):
//   Idle -> Loading -> { Success | Error | Idle (cancelled) } -> Idle (reset)

use crate::app::artifact::ArtifactStore;
use crate::app::capability::ScanCapability;
use crate::core::model::{
    DocumentRef, PageRef, ScanOutcome, ScanRequest, ScanResult, ScanState, ScannerOptions,
};
use crate::core::notify::{NotificationChannel, Subscription};
use crate::core::observable::{self, StateReader, StateWriter};
use crate::util::constants::{PDF_CREATED_MESSAGE, SAVE_WORKER_THREAD_NAME};
use crate::util::error::CapabilityError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

// =============================================================================
// SessionController
// =============================================================================

struct Inner {
    state: StateWriter<ScanState>,
    /// Id of the session the snapshot belongs to. Only changed inside a
    /// state transition, so it moves in lockstep with the snapshot.
    session: AtomicU64,
    store: Arc<dyn ArtifactStore>,
    notifications: NotificationChannel,
    capability: Arc<dyn ScanCapability>,
    options: ScannerOptions,
}

/// Coordinates one scan session at a time.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.current_session())
            .field("state", &self.inner.state.current())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller with the default snapshot. All collaborators are
    /// injected here; the controller never looks them up globally.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        notifications: NotificationChannel,
        capability: Arc<dyn ScanCapability>,
        options: ScannerOptions,
    ) -> Self {
        let (state, _initial_reader) = observable::channel(ScanState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                session: AtomicU64::new(0),
                store,
                notifications,
                capability,
                options,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Readers
    // -------------------------------------------------------------------------

    /// Attach a reader to the snapshot. It starts at the latest snapshot.
    pub fn watch(&self) -> StateReader<ScanState> {
        self.inner.state.subscribe()
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> Arc<ScanState> {
        self.inner.state.current()
    }

    /// Attach a subscriber to the notification channel.
    pub fn notifications(&self) -> Subscription {
        self.inner.notifications.subscribe()
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Begin a scan session.
    ///
    /// A no-op while a session is already loading; returns whether a new
    /// session was started. On start the snapshot keeps its pages and
    /// artifact but clears both messages.
    pub fn start_scan(&self) -> bool {
        let mut session = 0;
        let started = self.inner.state.transition(|prev| {
            if prev.is_loading {
                return None;
            }
            session = self.inner.session.fetch_add(1, Ordering::SeqCst) + 1;
            Some(ScanState {
                is_loading: true,
                error_message: String::new(),
                status_message: String::new(),
                ..prev.clone()
            })
        });

        if started.is_none() {
            tracing::debug!("Scan already in progress; start request ignored");
            return false;
        }

        tracing::info!(session, options = ?self.inner.options, "Scan started");
        let request = ScanRequest {
            options: self.inner.options.clone(),
        };
        // No lock is held here, so a capability may complete synchronously.
        self.inner.capability.begin(
            request,
            ScanCompletion::new(Arc::downgrade(&self.inner), session),
        );
        true
    }

    /// Apply an outcome to the current session.
    ///
    /// Cancellation and failures are applied before this returns. A result
    /// with a combined document is persisted on a background thread; the
    /// returned handle can be waited on or dropped (fire-and-forget).
    /// Capabilities report through their `ScanCompletion`, which also drops
    /// outcomes of sessions that were reset or restarted in the meantime.
    pub fn handle_scan_result(&self, outcome: ScanOutcome) -> ProcessingHandle {
        self.apply(self.current_session(), outcome)
    }

    /// Replace the snapshot with the default one.
    ///
    /// Any session still in flight is abandoned: its outcome will be dropped.
    pub fn reset_state(&self) {
        self.inner.state.transition(|_| {
            self.inner.session.fetch_add(1, Ordering::SeqCst);
            Some(ScanState::default())
        });
        tracing::debug!(session = self.current_session(), "Scan state reset");
    }

    /// Send a transient message without touching the snapshot.
    pub fn publish_notification(&self, message: impl AsRef<str>) {
        self.inner.notifications.publish(message);
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    fn current_session(&self) -> u64 {
        self.inner.session.load(Ordering::SeqCst)
    }

    /// Replace the snapshot with `f(prev)` if `session` is still current.
    /// Returns whether the transition was applied.
    fn transition_for<F>(&self, session: u64, f: F) -> bool
    where
        F: FnOnce(&ScanState) -> ScanState,
    {
        let applied = self
            .inner
            .state
            .transition(|prev| (self.current_session() == session).then(|| f(prev)))
            .is_some();
        if !applied {
            tracing::debug!(
                session,
                current = self.current_session(),
                "Outcome for a superseded session dropped"
            );
        }
        applied
    }

    fn apply(&self, session: u64, outcome: ScanOutcome) -> ProcessingHandle {
        match outcome {
            ScanOutcome::Cancelled => {
                let cancelled = self.transition_for(session, |prev| ScanState {
                    is_loading: false,
                    ..prev.clone()
                });
                if cancelled {
                    tracing::info!(session, "Scan cancelled");
                }
                ProcessingHandle::done()
            }
            ScanOutcome::Failed(e) => {
                self.fail(session, &e.to_string(), &e);
                ProcessingHandle::done()
            }
            ScanOutcome::Completed(result) => self.complete(session, result),
        }
    }

    fn complete(&self, session: u64, result: ScanResult) -> ProcessingHandle {
        let ScanResult {
            pages,
            document,
            page_count,
        } = result;

        if let Some(count) = page_count {
            if usize::try_from(count).ok() != Some(pages.len()) {
                tracing::warn!(
                    reported = count,
                    received = pages.len(),
                    "Page count does not match page references"
                );
            }
        }

        let Some(document) = document else {
            if pages.is_empty() {
                let e = CapabilityError::EmptyResult;
                self.fail(session, &e.to_string(), &e);
            } else {
                self.record_pages_only(session, pages);
            }
            return ProcessingHandle::done();
        };

        if self.current_session() != session {
            tracing::debug!(session, "Result for a superseded session; document not saved");
            return ProcessingHandle::done();
        }

        tracing::info!(
            session,
            pages = pages.len(),
            page_count = ?page_count,
            "Scan completed; saving document"
        );

        let worker = self.clone();
        let spawned = thread::Builder::new()
            .name(SAVE_WORKER_THREAD_NAME.to_string())
            .spawn({
                let document = document.clone();
                let pages = pages.clone();
                move || worker.persist(session, pages, &document)
            });

        match spawned {
            Ok(handle) => ProcessingHandle::running(handle),
            Err(e) => {
                // Without a worker the save still has to happen exactly once.
                tracing::warn!(error = %e, "Cannot spawn save thread; saving inline");
                self.persist(session, pages, &document);
                ProcessingHandle::done()
            }
        }
    }

    fn persist(&self, session: u64, pages: Vec<PageRef>, document: &DocumentRef) {
        match self.inner.store.save(document) {
            Ok(location) => {
                tracing::info!(
                    session,
                    path = %location.path.display(),
                    bytes = location.size_bytes,
                    "Scanned document persisted"
                );
                self.transition_for(session, |_| ScanState {
                    image_uris: pages,
                    has_persisted_artifact: true,
                    is_loading: false,
                    artifact_uri: Some(location),
                    status_message: PDF_CREATED_MESSAGE.to_string(),
                    error_message: String::new(),
                });
            }
            Err(e) => self.fail(session, &e.to_string(), &e),
        }
    }

    fn record_pages_only(&self, session: u64, pages: Vec<PageRef>) {
        let count = pages.len();
        let recorded = self.transition_for(session, |_| ScanState {
            image_uris: pages,
            has_persisted_artifact: false,
            is_loading: false,
            artifact_uri: None,
            status_message: format!("Scanned {count} page(s); no PDF was produced"),
            error_message: String::new(),
        });
        if recorded {
            tracing::info!(session, pages = count, "Scan completed without a combined document");
        }
    }

    /// Record a capability or persistence failure and notify once.
    fn fail(&self, session: u64, message: &str, cause: &dyn std::error::Error) {
        let recorded = self.transition_for(session, |prev| ScanState {
            is_loading: false,
            has_persisted_artifact: false,
            artifact_uri: None,
            error_message: message.to_string(),
            ..prev.clone()
        });
        if recorded {
            tracing::warn!(session, error = %cause, "Scan session failed");
            self.inner.notifications.publish(message);
        }
    }
}

// =============================================================================
// Completion plumbing
// =============================================================================

/// One-shot callback handed to the capability with each scan request.
///
/// Dropping it without calling `complete` counts as a cancellation, so a
/// capability that loses its callback can never leave the session loading.
/// Once the controller itself is gone, delivering an outcome does nothing.
pub struct ScanCompletion {
    controller: Option<Weak<Inner>>,
    session: u64,
}

impl ScanCompletion {
    fn new(controller: Weak<Inner>, session: u64) -> Self {
        Self {
            controller: Some(controller),
            session,
        }
    }

    fn take_controller(&mut self) -> Option<SessionController> {
        let inner = self.controller.take()?.upgrade()?;
        Some(SessionController { inner })
    }

    /// Deliver the scan's outcome to the controller.
    pub fn complete(mut self, outcome: ScanOutcome) -> ProcessingHandle {
        match self.take_controller() {
            Some(controller) => controller.apply(self.session, outcome),
            None => {
                tracing::debug!(session = self.session, "Controller gone; scan outcome dropped");
                ProcessingHandle::done()
            }
        }
    }
}

impl Drop for ScanCompletion {
    fn drop(&mut self) {
        if let Some(controller) = self.take_controller() {
            tracing::debug!(
                session = self.session,
                "Scan completion dropped without an outcome; treating as cancelled"
            );
            controller.apply(self.session, ScanOutcome::Cancelled);
        }
    }
}

impl std::fmt::Debug for ScanCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCompletion")
            .field("session", &self.session)
            .field("pending", &self.controller.is_some())
            .finish()
    }
}

/// Handle to the processing of one scan outcome.
///
/// Dropping it detaches the work; the snapshot still updates when it ends.
#[derive(Debug)]
pub struct ProcessingHandle {
    worker: Option<JoinHandle<()>>,
}

impl ProcessingHandle {
    fn done() -> Self {
        Self { worker: None }
    }

    fn running(handle: JoinHandle<()>) -> Self {
        Self {
            worker: Some(handle),
        }
    }

    /// Block until the outcome has been applied to the snapshot.
    pub fn wait(self) {
        if let Some(handle) = self.worker {
            if handle.join().is_err() {
                tracing::error!("Save thread panicked");
            }
        }
    }
}

// =============================================================================
// Unit tests
// =============================================================================
