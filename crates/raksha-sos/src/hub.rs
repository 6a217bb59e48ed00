//! Best-effort fan-out of [`SosEvent`]s to connected observers.
//!
//! Backed by a [`tokio::sync::broadcast`] channel: every subscriber gets
//! every event published after it attached, at most once per connection,
//! with no queuing or replay for parties that are not connected. A
//! subscriber that falls behind by more than the channel capacity skips
//! ahead; that loss is handled (and logged) at the subscriber's end, never
//! propagated to the publisher.

use raksha_core::event::SosEvent;
use tokio::sync::broadcast;

/// Default channel capacity before a slow observer starts skipping.
const DEFAULT_CAPACITY: usize = 256;

/// A handle to the event broadcast channel.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventHub {
  tx: broadcast::Sender<SosEvent>,
}

impl EventHub {
  pub fn new() -> Self { Self::with_capacity(DEFAULT_CAPACITY) }

  pub fn with_capacity(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  /// Attach a new observer. The receiver yields every event published
  /// from this moment on.
  pub fn subscribe(&self) -> broadcast::Receiver<SosEvent> {
    self.tx.subscribe()
  }

  /// Publish one event to every currently connected observer.
  ///
  /// Never blocks and never fails from the caller's perspective: zero
  /// observers is normal (returns 0), and individual delivery problems are
  /// isolated to the affected receiver.
  pub fn publish(&self, event: SosEvent) -> usize {
    let alert_id = event.alert_id().to_owned();
    // send errs only when there are zero receivers, which is not an error.
    let delivered = self.tx.send(event).unwrap_or(0);
    tracing::debug!(%alert_id, observers = delivered, "published sos event");
    delivered
  }

  /// Number of currently attached observers.
  pub fn observer_count(&self) -> usize { self.tx.receiver_count() }
}

impl Default for EventHub {
  fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  fn resolved_event(alert_id: &str) -> SosEvent {
    SosEvent::Resolved {
      alert_id:    alert_id.to_string(),
      resolved_by: Uuid::new_v4(),
    }
  }

  #[tokio::test]
  async fn publish_without_observers_returns_zero() {
    let hub = EventHub::new();
    assert_eq!(hub.publish(resolved_event("a1")), 0);
  }

  #[tokio::test]
  async fn every_observer_receives_every_event_in_order() {
    let hub = EventHub::new();
    let mut rx1 = hub.subscribe();
    let mut rx2 = hub.subscribe();

    assert_eq!(hub.publish(resolved_event("a1")), 2);
    assert_eq!(hub.publish(resolved_event("a2")), 2);

    for rx in [&mut rx1, &mut rx2] {
      assert_eq!(rx.recv().await.unwrap().alert_id(), "a1");
      assert_eq!(rx.recv().await.unwrap().alert_id(), "a2");
    }
  }

  #[tokio::test]
  async fn late_subscriber_sees_only_subsequent_events() {
    let hub = EventHub::new();
    hub.publish(resolved_event("a1"));

    let mut rx = hub.subscribe();
    hub.publish(resolved_event("a2"));

    assert_eq!(rx.recv().await.unwrap().alert_id(), "a2");
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn dropped_observer_stops_counting() {
    let hub = EventHub::new();
    let rx = hub.subscribe();
    assert_eq!(hub.observer_count(), 1);
    drop(rx);
    assert_eq!(hub.observer_count(), 0);
  }
}
