//! Publish/subscribe for change events.
//!
//! Delivery is lossy: a subscriber that falls more than the channel capacity
//! behind skips ahead, and publishing never waits on subscribers.

use tokio::sync::broadcast;

use crate::ChangeEvent;

pub const DEFAULT_CAPACITY: usize = 256;

pub trait ChangeBus: Send + Sync {
    fn publish(&self, event: ChangeEvent);

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

#[derive(Debug, Clone)]
pub struct BroadcastChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl BroadcastChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeBus for BroadcastChangeBus {
    fn publish(&self, event: ChangeEvent) {
        tracing::debug!(table = %event.table, action = %event.action, record_id = %event.record_id, "change published");
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::ChangeAction;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = BroadcastChangeBus::default();
        let mut rx = bus.subscribe();
        bus.publish(ChangeEvent::new("fleets", ChangeAction::Insert, Uuid::now_v7(), Utc::now()));

        let got = rx.recv().await.unwrap();
        assert_eq!(got.table, "fleets");
        assert_eq!(got.action, ChangeAction::Insert);
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let bus = BroadcastChangeBus::new(1);
        bus.publish(ChangeEvent::new("x", ChangeAction::Delete, Uuid::now_v7(), Utc::now()));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscribers_lag_instead_of_blocking() {
        let bus = BroadcastChangeBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(ChangeEvent::new("x", ChangeAction::Update, Uuid::now_v7(), Utc::now()));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}
