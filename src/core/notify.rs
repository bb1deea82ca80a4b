// DocScan - core/notify.rs
//
// Broadcast channel for transient, non-sticky messages, over
// `tokio::sync::broadcast`.
//
// Delivery policy:
//   - `publish` hands the message to every subscription attached at that
//     moment. With nobody attached the message is discarded; there is no
//     replay for late subscribers.
//   - The channel buffers `NOTIFICATION_CAPACITY` (one) message. A
//     subscriber that falls behind skips to the newest message; the
//     skipped ones are counted in `dropped`.
//   - A subscription ends once every `NotificationChannel` handle is gone.
//     Dropping a subscription detaches it.

use super::blocking::block_on_timeout;
use crate::util::constants::NOTIFICATION_CAPACITY;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Publish/subscribe handle. Clones share the same subscriber set.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    sender: broadcast::Sender<String>,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self { sender }
    }

    /// Deliver `message` to every attached subscription.
    ///
    /// Returns how many subscriptions received it.
    pub fn publish(&self, message: impl AsRef<str>) -> usize {
        let message = message.as_ref();
        match self.sender.send(message.to_string()) {
            Ok(delivered) => {
                tracing::trace!(notification = message, delivered, "Notification published");
                delivered
            }
            Err(_) => {
                tracing::debug!(
                    notification = message,
                    "Notification published with no subscriber; discarded"
                );
                0
            }
        }
    }

    /// Attach a new subscription. It receives messages published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            dropped: 0,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// One consumer's view of a `NotificationChannel`.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<String>,
    /// Messages skipped because a newer one arrived before they were read.
    dropped: u64,
}

impl Subscription {
    /// Take the pending message, if any, without blocking.
    pub fn try_recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(skipped)) => self.dropped += skipped,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next message. `None` once the channel is closed and
    /// nothing is pending.
    pub async fn next_message(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => self.dropped += skipped,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Blocking `next_message`. Must not be called from inside a runtime.
    pub fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.blocking_recv() {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => self.dropped += skipped,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Like `recv`, giving up after `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<String> {
        block_on_timeout(timeout, self.next_message()).flatten()
    }

    /// Take every message currently available without blocking.
    pub fn drain(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Number of messages skipped before this subscriber read them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Iterator for Subscription {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.recv()
    }
}
