//! Score push: GET /publish-score?sig=A&score=10
//!
//! Sets a team's score directly from a URL hit. Score buzzers still call the
//! older `/score` path, which lands here as well. Response is JSON:
//! `{ "success": true }` or `{ "success": false, "message": "..." }`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use buzzline_protocol::frames::KIND_SCORE;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

#[derive(Deserialize)]
pub struct ScoreQuery {
    pub sig: Option<String>,
    pub score: Option<String>,
}

/// Payload of a `score` event.
#[derive(Serialize)]
struct ScorePush {
    sig: String,
    score: i64,
}

fn rejection(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": message})),
    )
}

/// GET /publish-score (and /score): broadcast a `score` event.
pub async fn publish_score(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScoreQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let (sig, raw_score) = match (query.sig, query.score) {
        (Some(sig), Some(score)) if !sig.is_empty() && !score.is_empty() => (sig, score),
        _ => return Err(rejection("Missing sig or score")),
    };

    let score: i64 = raw_score.trim().parse().map_err(|_| {
        warn!(sig = %sig, score = %raw_score, "non-integer score rejected");
        rejection("Invalid score")
    })?;

    info!(sig = %sig, score, "score received");
    state.hub.publish(KIND_SCORE, ScorePush { sig, score }).await;

    Ok(Json(json!({"success": true})))
}
