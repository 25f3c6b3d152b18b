// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed broadcast bus for internal events.
//!
//! Components publish state changes (profile updates, forced sign-outs,
//! notices) on an [`EventBus`]; any number of consumers subscribe.
//!
//! # Design Principles
//!
//! - Uses `tokio::sync::broadcast` for fan-out
//! - Publishing with no subscribers is not an error
//! - Lagging subscribers skip dropped events and keep receiving
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_core::bus::EventBus;
//!
//! let bus: EventBus<String> = EventBus::new(64);
//! let mut subscriber = bus.subscribe();
//! bus.publish("hello".to_string());
//! assert_eq!(subscriber.recv().await?, "hello");
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::StoreError;

// =============================================================================
// Bus Statistics
// =============================================================================

/// Statistics for an event bus.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Total events published.
    pub events_published: u64,
    /// Events dropped due to lag.
    pub events_dropped: u64,
    /// Current number of subscribers.
    pub subscriber_count: u64,
}

/// Atomic statistics for lock-free updates.
#[derive(Debug, Default)]
struct AtomicBusStats {
    events_published: AtomicU64,
    events_dropped: AtomicU64,
}

// =============================================================================
// Event Bus
// =============================================================================

/// A broadcast bus for distributing events of type `E`.
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
    capacity: usize,
    stats: Arc<AtomicBusStats>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
    /// Creates a new bus with the specified capacity.
    ///
    /// The capacity determines how many events can be buffered before slow
    /// subscribers start losing them.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            sender,
            capacity: capacity.max(1),
            stats: Arc::new(AtomicBusStats::default()),
        }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that will receive it.
    pub fn publish(&self, event: E) -> usize {
        self.stats.events_published.fetch_add(1, Ordering::Relaxed);
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new subscriber. It only sees events published afterwards.
    pub fn subscribe(&self) -> EventSubscriber<E> {
        EventSubscriber {
            receiver: self.sender.subscribe(),
            stats: self.stats.clone(),
        }
    }

    /// Returns the current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns current statistics.
    pub fn stats(&self) -> BusStats {
        BusStats {
            events_published: self.stats.events_published.load(Ordering::Relaxed),
            events_dropped: self.stats.events_dropped.load(Ordering::Relaxed),
            subscriber_count: self.subscriber_count() as u64,
        }
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
            stats: self.stats.clone(),
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscriber_count", &self.sender.receiver_count())
            .field(
                "events_published",
                &self.stats.events_published.load(Ordering::Relaxed),
            )
            .finish()
    }
}

// =============================================================================
// Event Subscriber
// =============================================================================

/// A subscriber to an [`EventBus`].
pub struct EventSubscriber<E> {
    receiver: broadcast::Receiver<E>,
    stats: Arc<AtomicBusStats>,
}

impl<E: Clone + Send + 'static> EventSubscriber<E> {
    /// Receives the next event.
    ///
    /// Returns `Err(StoreError::Closed)` once every bus handle is dropped.
    pub async fn recv(&mut self) -> Result<E, StoreError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Closed) => return Err(StoreError::Closed),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.stats.events_dropped.fetch_add(count, Ordering::Relaxed);
                    tracing::warn!(count, "Event subscriber lagged, events dropped");
                }
            }
        }
    }

    /// Tries to receive an event without waiting.
    pub fn try_recv(&mut self) -> Result<Option<E>, StoreError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Ok(Some(event)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(StoreError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    self.stats.events_dropped.fetch_add(count, Ordering::Relaxed);
                }
            }
        }
    }

    /// Drains every queued event.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus: EventBus<u32> = EventBus::new(16);
        let mut subscriber = bus.subscribe();

        assert_eq!(bus.publish(7), 1);
        assert_eq!(subscriber.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus: EventBus<&'static str> = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish("x");

        assert_eq!(a.recv().await.unwrap(), "x");
        assert_eq!(b.recv().await.unwrap(), "x");
        assert_eq!(bus.stats().subscriber_count, 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus: EventBus<u8> = EventBus::new(4);
        assert_eq!(bus.publish(1), 0);
        assert_eq!(bus.stats().events_published, 1);
    }

    #[test]
    fn test_lagged_subscriber_skips_dropped() {
        let bus: EventBus<u8> = EventBus::new(2);
        let mut subscriber = bus.subscribe();
        for i in 0..5 {
            bus.publish(i);
        }

        let received = subscriber.drain();
        assert_eq!(received, vec![3, 4]);
        assert_eq!(bus.stats().events_dropped, 3);
    }
}
