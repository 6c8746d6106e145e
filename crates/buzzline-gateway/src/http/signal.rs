//! Buzzer signal ingress: GET /publish-signal?sig=A
//!
//! The buzzer box fires a plain GET per button press and ignores the
//! response body. Older boxes hit `/api/signal` or the root URL instead,
//! so both are served here too.

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use buzzline_protocol::frames::KIND_SIGNAL;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;

const MISSING_SIG: &str = "Missing \"sig\" query parameter";

#[derive(Deserialize)]
pub struct SignalQuery {
    pub sig: Option<String>,
}

impl SignalQuery {
    fn signal(self) -> Option<String> {
        self.sig.filter(|s| !s.is_empty())
    }
}

/// GET /publish-signal (and /api/signal): broadcast a `signal` event.
pub async fn publish_signal(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalQuery>,
) -> Result<String, (StatusCode, &'static str)> {
    let signal = query
        .signal()
        .ok_or((StatusCode::BAD_REQUEST, MISSING_SIG))?;

    Ok(relay(&state, signal).await)
}

/// GET /: the root URL doubles as a signal endpoint when `sig` is set.
pub async fn root_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalQuery>,
) -> String {
    match query.signal() {
        Some(signal) => relay(&state, signal).await,
        None => "Buzzline relay is running.".to_string(),
    }
}

async fn relay(state: &AppState, signal: String) -> String {
    info!(signal = %signal, "signal received");
    state.hub.publish(KIND_SIGNAL, &signal).await;
    format!("Signal '{signal}' received.")
}
