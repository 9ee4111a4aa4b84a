//! Push channel.
//!
//! Catalog change notifications arrive outside the request/response cycle.
//! Consumers call [`PushChannel::subscribe`] once and hold the returned
//! [`Subscription`]; dropping it releases the registration, so there is no
//! unsubscribe call to forget or to pair incorrectly.
//!
//! [`EventHub`] is the in-process fan-out every transport publishes into.
//! [`spawn_event_stream`] feeds it from an NDJSON stream over HTTP.

mod http;

pub use http::{EventStreamHandle, spawn_event_stream};

use storefront_sync_core::PushEvent;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default number of events buffered per subscriber before it lags.
pub const DEFAULT_CAPACITY: usize = 256;

/// A source of push events.
pub trait PushChannel: Send + Sync {
    /// Register a new subscriber. Events published after this call are
    /// delivered to it in publish order.
    fn subscribe(&self) -> Subscription;
}

// =============================================================================
// Subscription
// =============================================================================

/// A live registration on a push channel. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<PushEvent>,
}

impl Subscription {
    /// Wrap a broadcast receiver.
    #[must_use]
    pub const fn new(receiver: broadcast::Receiver<PushEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the channel is closed. If this subscriber fell
    /// behind, the skipped events are logged and delivery resumes with the
    /// oldest event still buffered.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Push subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// =============================================================================
// EventHub
// =============================================================================

/// In-process broadcast of push events.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<PushEvent>,
}

impl EventHub {
    /// Create a hub buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver `event` to every current subscriber. Returns how many
    /// subscribers received it; zero is not an error.
    pub fn publish(&self, event: PushEvent) -> usize {
        let name = event.name();
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(event = name, delivered, "Published push event");
        delivered
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PushChannel for EventHub {
    fn subscribe(&self) -> Subscription {
        Subscription::new(self.sender.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storefront_sync_core::ProductId;

    use super::*;

    fn deleted(id: &str) -> PushEvent {
        PushEvent::ProductDeleted(ProductId::new(id))
    }

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe();

        hub.publish(deleted("a"));
        hub.publish(deleted("b"));

        assert_eq!(sub.recv().await, Some(deleted("a")));
        assert_eq!(sub.recv().await, Some(deleted("b")));
    }

    #[tokio::test]
    async fn test_drop_releases_registration() {
        let hub = EventHub::default();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(deleted("a")), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_resumes() {
        let hub = EventHub::new(2);
        let mut sub = hub.subscribe();

        for id in ["a", "b", "c", "d"] {
            hub.publish(deleted(id));
        }

        assert_eq!(sub.recv().await, Some(deleted("c")));
        assert_eq!(sub.recv().await, Some(deleted("d")));
    }

    #[tokio::test]
    async fn test_closed_hub_ends_subscription() {
        let hub = EventHub::default();
        let mut sub = hub.subscribe();
        drop(hub);
        assert_eq!(sub.recv().await, None);
    }
}
