//! # Event bus for broadcasting queue events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (submission path,
//! drain loop, cooperative wait helper).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for queue events.
///
/// Thin wrapper over [`tokio::sync::broadcast`] with a `publish`/`subscribe`
/// API. Cheap to clone (internally holds an `Arc`-backed sender).
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// Capacity is shared across all receivers; the minimum is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers, the event is dropped and this still
    /// returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// A receiver only gets events sent **after** it subscribes; slow
    /// receivers observe `RecvError::Lagged(n)` and skip missed items.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::now(EventKind::DrainStarted).with_queue("q"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::DrainStarted);
        assert_eq!(ev.queue.as_deref(), Some("q"));
    }

    #[test]
    fn test_capacity_is_clamped_to_one() {
        // Must not panic on a zero capacity.
        let bus = Bus::new(0);
        bus.publish(Event::now(EventKind::DrainIdle));
    }
}
