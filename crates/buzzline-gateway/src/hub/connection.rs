use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::IntoResponse,
};
use buzzline_protocol::frames::{Frame, KEEPALIVE_FRAME};
use futures_util::Stream;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::AppState;
use crate::hub::sink::{ChannelSink, SubscriberHandle};
use crate::hub::subscription::Subscription;

/// Axum handler: opens a long-lived event stream (GET /stream, GET /game/events).
pub async fn stream_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cfg = &state.config.hub;
    let (tx, rx) = mpsc::channel::<Frame>(cfg.channel_capacity);
    let sink = ChannelSink::new(tx, cfg.write_timeout_ms);
    let subscription = Subscription::open(
        Arc::clone(&state.hub),
        SubscriberHandle::new(Arc::new(sink)),
    );

    let keepalive = (cfg.keepalive_secs > 0).then(|| Duration::from_secs(cfg.keepalive_secs));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(frame_stream(subscription, rx, keepalive)),
    )
}

/// Response body of one stream. Owns the subscription, so dropping the body
/// (client gone, server shutting down, or queue closed) unsubscribes.
fn frame_stream(
    subscription: Subscription,
    mut rx: mpsc::Receiver<Frame>,
    keepalive: Option<Duration>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        let subscription = subscription;
        let mut tick = keepalive.map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval
        });

        loop {
            // None = heartbeat due, Some(None) = queue closed
            let next = match tick.as_mut() {
                Some(interval) => tokio::select! {
                    frame = rx.recv() => Some(frame),
                    _ = interval.tick() => None,
                },
                None => Some(rx.recv().await),
            };

            match next {
                Some(Some(frame)) => yield Ok(frame.to_bytes()),
                Some(None) => {
                    debug!(subscriber = %subscription.id(), "evicted by hub, ending stream");
                    break;
                }
                None => yield Ok(Bytes::from_static(KEEPALIVE_FRAME.as_bytes())),
            }
        }
    }
}
