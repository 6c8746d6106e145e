use std::sync::Arc;

use buzzline_core::types::SubscriberId;

use crate::hub::registry::Hub;
use crate::hub::sink::SubscriberHandle;

/// Registration of one stream with the hub, released on drop.
///
/// Holds only the id, never the handle: once the hub evicts a stream, the
/// sink's last sender is gone and the stream's queue closes.
pub struct Subscription {
    hub: Arc<Hub>,
    id: SubscriberId,
}

impl Subscription {
    pub fn open(hub: Arc<Hub>, handle: SubscriberHandle) -> Self {
        let id = handle.id().clone();
        hub.subscribe(handle);
        Self { hub, id }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // no-op when a failed delivery already evicted us
        self.hub.unsubscribe(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::sink::ChannelSink;
    use tokio::sync::mpsc;

    fn channel_handle() -> (SubscriberHandle, mpsc::Receiver<buzzline_protocol::frames::Frame>) {
        let (tx, rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx, 50);
        (SubscriberHandle::new(Arc::new(sink)), rx)
    }

    #[test]
    fn drop_unsubscribes() {
        let hub = Arc::new(Hub::new());
        let (handle, _rx) = channel_handle();

        let subscription = Subscription::open(Arc::clone(&hub), handle);
        assert_eq!(hub.len(), 1);

        drop(subscription);
        assert!(hub.is_empty());
    }

    #[test]
    fn drop_after_eviction_is_harmless() {
        let hub = Arc::new(Hub::new());
        let (handle, _rx) = channel_handle();
        let (other, _other_rx) = channel_handle();
        hub.subscribe(other);

        let subscription = Subscription::open(Arc::clone(&hub), handle);
        hub.unsubscribe(subscription.id());
        drop(subscription);

        assert_eq!(hub.len(), 1);
    }
}
