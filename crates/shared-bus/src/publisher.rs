//! # Event Publisher
//!
//! The producing half of the bus. Registries publish through
//! `Arc<dyn EventPublisher>` and never see the channel directly.

use crate::events::{EventFilter, LedgerEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Anything that can accept a ledger event.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `event`, returning how many subscribers it reached.
    ///
    /// Publishing with no subscribers is not an error.
    async fn publish(&self, event: LedgerEvent) -> usize;
}

/// Broadcast-backed bus shared by the gateway and its listeners.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<LedgerEvent>,
    capacity: usize,
    published: AtomicU64,
    undelivered: AtomicU64,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may fall behind before
    /// it starts losing events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            capacity: capacity.max(1),
            published: AtomicU64::new(0),
            undelivered: AtomicU64::new(0),
        }
    }

    /// Receive every future event that passes `filter`.
    ///
    /// Events published before this call are not replayed.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "Ledger event subscription opened");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events handed to `publish` so far.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Events published while nobody was listening.
    #[must_use]
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: LedgerEvent) -> usize {
        let name = event.name();
        self.published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(event = name, receivers, "Ledger event published");
                receivers
            }
            Err(_) => {
                self.undelivered.fetch_add(1, Ordering::Relaxed);
                trace!(event = name, "Ledger event had no subscribers");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTopic;

    fn offline() -> LedgerEvent {
        LedgerEvent::Offline {
            reason: "connection refused".into(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_listeners_is_counted() {
        let bus = InMemoryEventBus::new();

        assert_eq!(bus.publish(offline()).await, 0);
        assert_eq!(bus.published(), 1);
        assert_eq!(bus.undelivered(), 1);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_broadcast() {
        let bus = InMemoryEventBus::new();
        let _all = bus.subscribe(EventFilter::all());
        let _docs = bus.subscribe(EventFilter::topics(vec![EventTopic::Documents]));

        // Filtering happens on the receiving side.
        assert_eq!(bus.publish(offline()).await, 2);
        assert_eq!(bus.subscriber_count(), 2);
        assert_eq!(bus.undelivered(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus = InMemoryEventBus::with_capacity(0);
        assert_eq!(bus.capacity(), 1);
        assert_eq!(InMemoryEventBus::default().capacity(), DEFAULT_CHANNEL_CAPACITY);
    }
}
