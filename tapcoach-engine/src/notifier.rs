//! Outbound event broadcasting
//!
//! The session components only see the [`Notifier`] trait. The engine wires in
//! [`EventBroadcaster`], which fans every event out to all WebSocket clients
//! through a tokio broadcast channel. Delivery is fire-and-forget.

use tapcoach_common::CoachEvent;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Outbound broadcast capability used by the session components
pub trait Notifier: Send + Sync {
    /// Deliver an event to every listener; never fails
    fn broadcast(&self, event: CoachEvent);
}

/// Broadcast channel fan-out to connected clients
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<CoachEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events buffered per lagging client
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        info!("Event broadcaster initialized with capacity {}", capacity);
        Self { tx }
    }

    /// Register a new listener
    pub fn subscribe(&self) -> broadcast::Receiver<CoachEvent> {
        self.tx.subscribe()
    }

    /// Get current number of connected listeners
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Notifier for EventBroadcaster {
    fn broadcast(&self, event: CoachEvent) {
        debug!("Broadcast {}", event);
        // No listeners is fine
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapcoach_common::Channel;

    #[test]
    fn test_broadcast_without_listeners_is_ok() {
        let broadcaster = EventBroadcaster::new(8);
        assert_eq!(broadcaster.client_count(), 0);
        broadcaster.broadcast(CoachEvent::Hit);
    }

    #[test]
    fn test_every_listener_gets_events_in_order() {
        let broadcaster = EventBroadcaster::new(8);
        let mut first = broadcaster.subscribe();
        let mut second = broadcaster.subscribe();
        assert_eq!(broadcaster.client_count(), 2);

        broadcaster.broadcast(CoachEvent::Tap(Channel::Kick));
        broadcaster.broadcast(CoachEvent::Hit);

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.try_recv().unwrap(), CoachEvent::Tap(Channel::Kick));
            assert_eq!(rx.try_recv().unwrap(), CoachEvent::Hit);
            assert!(rx.try_recv().is_err());
        }
    }
}
