//! Broadcast hub: the process-wide registry of open event streams.
//!
//! Registry mutation happens only through `subscribe` / `unsubscribe`.
//! `broadcast` works on a snapshot, so a subscriber evicted while a delivery
//! is in flight never invalidates the iteration. Dead streams are discovered
//! lazily: the first failed delivery evicts them.

use dashmap::{mapref::entry::Entry, DashMap};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use buzzline_core::types::SubscriberId;
use buzzline_protocol::frames::{self, Event};

use crate::hub::sink::SubscriberHandle;

/// Outcome of one broadcast. A summary, not an error channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fanout {
    pub delivered: usize,
    pub evicted: usize,
}

pub struct Hub {
    subscribers: DashMap<SubscriberId, SubscriberHandle>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Register a stream. Registering the same handle twice changes nothing.
    pub fn subscribe(&self, handle: SubscriberHandle) {
        let id = handle.id().clone();
        // entry guard must be gone before len() walks the shards
        let inserted = match self.subscribers.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        };

        if inserted {
            info!(subscriber = %id, subscribers = self.len(), "client connected");
        } else {
            debug!(subscriber = %id, "client already subscribed");
        }
    }

    /// Remove a stream if present. Returns false when it was already gone,
    /// which is normal when eviction and disconnect race.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let removed = self.subscribers.remove(id).is_some();
        if removed {
            info!(subscriber = %id, subscribers = self.len(), "client disconnected");
        }
        removed
    }

    /// Number of registered streams (diagnostics only).
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Drop every registration. Each stream's queue closes and its response
    /// ends. Returns how many streams were open.
    pub fn disconnect_all(&self) -> usize {
        let open = self.subscribers.len();
        self.subscribers.clear();
        open
    }

    #[cfg(test)]
    pub(crate) fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subscribers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Deliver `event` to every registered stream.
    ///
    /// Each delivery is independent: a failing stream is evicted and the
    /// others still get the frame. Never fails.
    pub async fn broadcast(&self, event: &Event) -> Fanout {
        if self.is_empty() {
            debug!(kind = %event.kind(), "no clients connected to broadcast to");
            return Fanout::default();
        }

        let frame = frames::encode(event);
        let snapshot: Vec<SubscriberHandle> = self
            .subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let frame = &frame;
        let outcomes = join_all(snapshot.iter().map(|handle| async move {
            let result = handle.deliver(frame).await;
            (handle, result)
        }))
        .await;

        let mut fanout = Fanout::default();
        for (handle, result) in outcomes {
            match result {
                Ok(()) => fanout.delivered += 1,
                Err(e) => {
                    debug!(subscriber = %handle.id(), error = %e, "could not send to client, evicting");
                    if self.unsubscribe(handle.id()) {
                        fanout.evicted += 1;
                    }
                }
            }
        }

        info!(
            kind = %event.kind(),
            bytes = frame.len(),
            delivered = fanout.delivered,
            evicted = fanout.evicted,
            "event broadcast"
        );
        fanout
    }

    /// Build an event from a serializable payload and broadcast it.
    pub async fn publish(&self, kind: &str, payload: impl Serialize) -> Fanout {
        match Event::from_serialize(kind, payload) {
            Ok(event) => self.broadcast(&event).await,
            Err(e) => {
                warn!(kind, error = %e, "event payload is not serializable, dropped");
                Fanout::default()
            }
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::sink::{DeliveryError, FrameSink};
    use async_trait::async_trait;
    use buzzline_protocol::frames::{encode, Frame, KIND_SCORE_UPDATE, KIND_SIGNAL};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Keeps every frame it is handed.
    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<Frame>>,
    }

    impl Recorder {
        fn received(&self) -> Vec<Frame> {
            self.frames.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FrameSink for Recorder {
        async fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    /// A client that went away without saying so.
    struct Broken;

    #[async_trait]
    impl FrameSink for Broken {
        async fn deliver(&self, _frame: &Frame) -> Result<(), DeliveryError> {
            Err(DeliveryError::Closed)
        }
    }

    fn recording() -> (Arc<Recorder>, SubscriberHandle) {
        let recorder = Arc::new(Recorder::default());
        let handle = SubscriberHandle::new(recorder.clone());
        (recorder, handle)
    }

    fn signal(sig: &str) -> Event {
        Event::new(KIND_SIGNAL, json!(sig))
    }

    #[tokio::test]
    async fn double_subscribe_delivers_once() {
        let hub = Hub::new();
        let (recorder, handle) = recording();

        hub.subscribe(handle.clone());
        hub.subscribe(handle);
        assert_eq!(hub.len(), 1);

        let fanout = hub.broadcast(&signal("A")).await;
        assert_eq!(fanout.delivered, 1);
        assert_eq!(recorder.received().len(), 1);
    }

    #[tokio::test]
    async fn failing_subscriber_is_evicted() {
        let hub = Hub::new();
        let (recorder, healthy) = recording();
        let broken = SubscriberHandle::new(Arc::new(Broken));
        hub.subscribe(healthy);
        hub.subscribe(broken);

        let first = hub.broadcast(&signal("A")).await;
        assert_eq!(first, Fanout { delivered: 1, evicted: 1 });
        assert_eq!(hub.len(), 1);

        let second = hub.broadcast(&signal("B")).await;
        assert_eq!(second, Fanout { delivered: 1, evicted: 0 });
        assert_eq!(recorder.received().len(), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let hub = Hub::new();
        let (_recorder, handle) = recording();
        let (_other, never_subscribed) = recording();
        hub.subscribe(handle.clone());

        assert!(hub.unsubscribe(handle.id()));
        assert!(!hub.unsubscribe(handle.id()));
        assert!(!hub.unsubscribe(never_subscribed.id()));
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn empty_registry_is_a_no_op() {
        let hub = Hub::new();
        let fanout = hub.broadcast(&signal("A")).await;
        assert_eq!(fanout, Fanout::default());
    }

    #[tokio::test]
    async fn every_subscriber_gets_identical_bytes() {
        let hub = Hub::new();
        let (first, h1) = recording();
        let (second, h2) = recording();
        hub.subscribe(h1);
        hub.subscribe(h2);

        let event = Event::new(KIND_SCORE_UPDATE, json!({"teamName": "Team 1", "scoreChange": 10}));
        hub.broadcast(&event).await;

        let a = first.received();
        let b = second.received();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].as_bytes(), b[0].as_bytes());
        assert_eq!(a[0], encode(&event));
    }

    #[tokio::test]
    async fn publish_wraps_payload_in_event() {
        let hub = Hub::new();
        let (recorder, handle) = recording();
        hub.subscribe(handle);

        hub.publish(KIND_SIGNAL, "C").await;
        assert_eq!(recorder.received(), vec![encode(&signal("C"))]);
    }

    #[test]
    fn disconnect_all_empties_registry() {
        let hub = Hub::new();
        let (_a, h1) = recording();
        let (_b, h2) = recording();
        hub.subscribe(h1);
        hub.subscribe(h2);

        assert_eq!(hub.disconnect_all(), 2);
        assert!(hub.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_channel_subscriber_is_evicted() {
        use crate::hub::sink::ChannelSink;

        let hub = Hub::new();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let stalled = SubscriberHandle::new(Arc::new(ChannelSink::new(tx, 20)));
        let (recorder, healthy) = recording();
        hub.subscribe(stalled);
        hub.subscribe(healthy);

        // first frame fills the queue, second one waits out the timeout
        hub.broadcast(&signal("A")).await;
        let fanout = hub.broadcast(&signal("B")).await;

        assert_eq!(fanout, Fanout { delivered: 1, evicted: 1 });
        assert_eq!(hub.len(), 1);
        assert_eq!(recorder.received().len(), 2);
    }

    /// Unsubscribes the listed ids from inside its own delivery, the way a
    /// stream closing mid-broadcast would.
    struct Unsubscriber {
        hub: Arc<Hub>,
        targets: Mutex<Vec<SubscriberId>>,
        frames: Mutex<Vec<Frame>>,
    }

    #[async_trait]
    impl FrameSink for Unsubscriber {
        async fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
            let targets = std::mem::take(&mut *self.targets.lock().unwrap());
            for id in &targets {
                self.hub.unsubscribe(id);
            }
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn unsubscribe_during_delivery_does_not_block_broadcast() {
        let hub = Arc::new(Hub::new());
        let unsubscriber = Arc::new(Unsubscriber {
            hub: Arc::clone(&hub),
            targets: Mutex::new(Vec::new()),
            frames: Mutex::new(Vec::new()),
        });
        let own = SubscriberHandle::new(unsubscriber.clone());
        let (sibling, sibling_handle) = recording();
        let (bystander, bystander_handle) = recording();
        unsubscriber
            .targets
            .lock()
            .unwrap()
            .extend([own.id().clone(), sibling_handle.id().clone()]);

        hub.subscribe(own);
        hub.subscribe(sibling_handle);
        hub.subscribe(bystander_handle);

        // a registry guard held across delivery would deadlock here
        let fanout = hub.broadcast(&signal("A")).await;

        // the snapshot was taken before delivery, so all three got the frame
        assert_eq!(fanout, Fanout { delivered: 3, evicted: 0 });
        assert_eq!(unsubscriber.frames.lock().unwrap().len(), 1);
        assert_eq!(sibling.received().len(), 1);
        assert_eq!(bystander.received().len(), 1);
        assert_eq!(hub.len(), 1);

        let next = hub.broadcast(&signal("B")).await;
        assert_eq!(next, Fanout { delivered: 1, evicted: 0 });
        assert_eq!(bystander.received().len(), 2);
        assert_eq!(sibling.received().len(), 1);
    }
}
