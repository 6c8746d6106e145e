//! Subscriber handles and the write capability behind them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use buzzline_core::types::SubscriberId;
use buzzline_protocol::frames::Frame;
use thiserror::Error;
use tokio::sync::mpsc;

/// Why one delivery to one subscriber did not happen.
/// Consumed by the hub to decide eviction; never reaches publishers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber stream closed")]
    Closed,

    #[error("write timed out after {ms}ms")]
    Timeout { ms: u64 },
}

/// Write side of one open event stream.
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError>;
}

/// Production sink: a bounded queue drained by the stream's response body.
///
/// A full queue makes `deliver` wait, but never longer than `write_timeout_ms`.
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
    write_timeout_ms: u64,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Frame>, write_timeout_ms: u64) -> Self {
        Self {
            tx,
            write_timeout_ms,
        }
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
        let limit = Duration::from_millis(self.write_timeout_ms);
        match tokio::time::timeout(limit, self.tx.send(frame.clone())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DeliveryError::Closed),
            Err(_) => Err(DeliveryError::Timeout {
                ms: self.write_timeout_ms,
            }),
        }
    }
}

/// One open outbound stream as the hub sees it.
///
/// Cloning is cheap and shares the sink. The hub's clone never closes the
/// stream; the connection that created the handle owns its lifetime.
#[derive(Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    sink: Arc<dyn FrameSink>,
}

impl SubscriberHandle {
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self {
            id: SubscriberId::new(),
            sink,
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub async fn deliver(&self, frame: &Frame) -> Result<(), DeliveryError> {
        self.sink.deliver(frame).await
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
