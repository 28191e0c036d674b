//! Completion signal bus for notification actions.
//!
//! One broadcast channel per [`ActionId`]. The bus is an ordinary value that
//! is cloned into whoever needs it; there is no process-wide instance.

use crate::core::{ActionId, CompletionSignal};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of each per-action channel.
pub const DEFAULT_CAPACITY: usize = 16;

/// Publish/subscribe hub for action completion signals.
///
/// Signals published before a subscription are not replayed, so callers
/// must subscribe before launching the action they want to hear from.
#[derive(Clone)]
pub struct SignalBus {
    channels: Arc<HashMap<ActionId, broadcast::Sender<CompletionSignal>>>,
    published: Arc<AtomicUsize>,
}

impl SignalBus {
    /// Creates a bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with the given per-action capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = ActionId::ALL
            .iter()
            .map(|&action| (action, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self {
            channels: Arc::new(channels),
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn sender(&self, action: ActionId) -> &broadcast::Sender<CompletionSignal> {
        // Every ActionId gets a channel in `with_capacity`.
        &self.channels[&action]
    }

    /// Publishes a completion signal for an action.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, action: ActionId, identity: impl Into<String>) -> usize {
        self.publish_signal(CompletionSignal::new(action, identity))
    }

    /// Publishes a prepared signal.
    pub fn publish_signal(&self, signal: CompletionSignal) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let action = signal.action;
        let reached = self.sender(action).send(signal).unwrap_or(0);
        debug!(action = %action, reached, "Published completion signal");
        reached
    }

    /// Subscribes to an action's signals.
    #[must_use]
    pub fn subscribe(&self, action: ActionId) -> broadcast::Receiver<CompletionSignal> {
        self.sender(action).subscribe()
    }

    /// Subscribes to an action's signals as a stream.
    ///
    /// Lagged receivers skip ahead; the stream ends when the bus is dropped.
    #[must_use]
    pub fn subscribe_stream(&self, action: ActionId) -> BoxStream<'static, CompletionSignal> {
        stream::unfold(self.subscribe(action), move |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(signal) => return Some((signal, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(action = %action, skipped, "Signal subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    /// Returns the number of live subscribers for an action.
    #[must_use]
    pub fn subscriber_count(&self, action: ActionId) -> usize {
        self.sender(action).receiver_count()
    }

    /// Returns the total number of signals published on the bus.
    #[must_use]
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("subscribers_a", &self.subscriber_count(ActionId::A))
            .field("subscribers_b", &self.subscriber_count(ActionId::B))
            .field("published", &self.published_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = SignalBus::new();
        assert_eq!(bus.publish(ActionId::A, "001"), 0);
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn test_each_subscriber_receives_signal() {
        let bus = SignalBus::new();
        let mut first = bus.subscribe(ActionId::A);
        let mut second = bus.subscribe(ActionId::A);

        assert_eq!(bus.publish(ActionId::A, "001"), 2);

        assert_eq!(first.recv().await.unwrap().identity, "001");
        assert_eq!(second.recv().await.unwrap().identity, "001");
    }

    #[tokio::test]
    async fn test_channels_are_per_action() {
        let bus = SignalBus::new();
        let mut a = bus.subscribe(ActionId::A);
        let _b = bus.subscribe(ActionId::B);

        bus.publish(ActionId::B, "001");
        assert!(a.try_recv().is_err());
        assert_eq!(bus.subscriber_count(ActionId::B), 1);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_signal() {
        let bus = SignalBus::new();
        bus.publish(ActionId::A, "001");

        let mut late = bus.subscribe(ActionId::A);
        assert!(late.try_recv().is_err());

        bus.publish(ActionId::A, "002");
        assert_eq!(late.recv().await.unwrap().identity, "002");
    }

    #[tokio::test]
    async fn test_stream_skips_lag() {
        let bus = SignalBus::with_capacity(1);
        let mut stream = bus.subscribe_stream(ActionId::B);

        bus.publish(ActionId::B, "old");
        bus.publish(ActionId::B, "new");

        let signal = stream.next().await.unwrap();
        assert_eq!(signal.identity, "new");
    }

    #[tokio::test]
    async fn test_clones_share_channels() {
        let bus = SignalBus::new();
        let clone = bus.clone();
        let mut rx = bus.subscribe(ActionId::A);

        clone.publish(ActionId::A, "001");
        assert_eq!(rx.recv().await.unwrap().action, ActionId::A);
        assert_eq!(bus.published_count(), 1);
    }
}
