use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use buzzline_core::config::BuzzlineConfig;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::hub::registry::Hub;

/// Central shared state (passed as Arc<AppState> to all Axum handlers).
pub struct AppState {
    pub config: BuzzlineConfig,
    /// One hub per process, shared by every stream and publisher.
    pub hub: Arc<Hub>,
}

impl AppState {
    pub fn new(config: BuzzlineConfig) -> Self {
        Self {
            config,
            hub: Arc::new(Hub::new()),
        }
    }
}

/// Publish endpoints are hit cross-origin by buzzer hardware and remote
/// admin pages.
fn publish_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let publish = Router::new()
        .route("/", get(crate::http::signal::root_handler))
        .route("/publish-signal", get(crate::http::signal::publish_signal))
        .route("/api/signal", get(crate::http::signal::publish_signal))
        .route("/publish-score", get(crate::http::score::publish_score))
        .route("/score", get(crate::http::score::publish_score))
        .route("/publish-update", post(crate::http::update::publish_update))
        .layer(publish_cors());

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/stream", get(crate::hub::connection::stream_handler))
        .route("/game/events", get(crate::hub::connection::stream_handler))
        .merge(publish)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
