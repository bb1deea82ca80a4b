// DocScan - core/observable.rs
//
// Single-writer, multi-reader snapshot cell over `tokio::sync::watch`.
//
// Architecture:
//   - `StateWriter` is the only handle that can replace the value. It is not
//     `Clone`, so ownership of the writer is ownership of the state.
//   - `StateReader`s are cheap clones of a watch receiver. A reader attached
//     late starts at the latest snapshot with nothing to replay.
//   - Values are stored as `Arc<T>` and swapped wholesale; readers holding an
//     older `Arc` keep a consistent (if stale) snapshot.
//   - Dropping the writer closes the channel; pending waits return `None`.
//
// The async waits (`changed`, `wait_for`) suit tokio consumers. The
// `wait_for_change`/`wait_until` variants block the calling thread and must
// not be used from inside a runtime.

use super::blocking::block_on_timeout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Create a state cell holding `initial`.
pub fn channel<T>(initial: T) -> (StateWriter<T>, StateReader<T>) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (StateWriter { tx }, StateReader { rx })
}

// =============================================================================
// Writer
// =============================================================================

/// Exclusive write handle for a state cell.
pub struct StateWriter<T> {
    tx: watch::Sender<Arc<T>>,
}

impl<T> StateWriter<T> {
    /// Replace the value unconditionally. Returns the new snapshot.
    pub fn replace(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.tx.send_replace(Arc::clone(&value));
        value
    }

    /// Compute the next value from the current one and publish it, atomically.
    ///
    /// `f` returning `None` leaves the cell untouched and wakes nobody.
    /// Returns the published snapshot, if any. `f` runs under the channel's
    /// write lock and must not touch the cell itself.
    pub fn transition<F>(&self, f: F) -> Option<Arc<T>>
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let mut published = None;
        self.tx.send_if_modified(|current| match f(current.as_ref()) {
            Some(next) => {
                let next = Arc::new(next);
                *current = Arc::clone(&next);
                published = Some(next);
                true
            }
            None => false,
        });
        published
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.tx.borrow())
    }

    /// Attach a new reader. It sees the latest snapshot and is woken only
    /// by transitions published after this call.
    pub fn subscribe(&self) -> StateReader<T> {
        StateReader {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of reader handles currently attached.
    pub fn reader_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T> std::fmt::Debug for StateWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateWriter")
            .field("readers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Read handle for a state cell.
pub struct StateReader<T> {
    rx: watch::Receiver<Arc<T>>,
}

impl<T> Clone for StateReader<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> StateReader<T> {
    /// Latest published snapshot. Does not mark it as seen.
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.rx.borrow())
    }

    /// Latest snapshot, marking it as seen.
    pub fn mark_seen(&mut self) -> Arc<T> {
        Arc::clone(&self.rx.borrow_and_update())
    }

    /// True if a snapshot newer than the last one seen has been published.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for a snapshot newer than the last one seen and mark it seen.
    /// `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<Arc<T>> {
        self.rx.changed().await.ok()?;
        Some(self.mark_seen())
    }

    /// Wait until the snapshot satisfies `pred`, checking the current one
    /// first. `None` if the writer goes away before that happens.
    pub async fn wait_for<P>(&mut self, mut pred: P) -> Option<Arc<T>>
    where
        P: FnMut(&T) -> bool,
    {
        let value = self.rx.wait_for(|value| pred(value)).await.ok()?;
        Some(Arc::clone(&value))
    }

    /// Blocking `changed`, giving up after `timeout`.
    pub fn wait_for_change(&mut self, timeout: Duration) -> Option<Arc<T>> {
        block_on_timeout(timeout, self.changed()).flatten()
    }

    /// Blocking `wait_for`, giving up after `timeout`.
    pub fn wait_until<P>(&mut self, pred: P, timeout: Duration) -> Option<Arc<T>>
    where
        P: FnMut(&T) -> bool,
    {
        block_on_timeout(timeout, self.wait_for(pred)).flatten()
    }

    /// False once the writer has been dropped.
    pub fn is_open(&self) -> bool {
        self.rx.has_changed().is_ok()
    }
}

impl<T> std::fmt::Debug for StateReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReader").finish_non_exhaustive()
    }
}
