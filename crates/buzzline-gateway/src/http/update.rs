//! Admin push: POST /publish-update
//!
//! Body: `{ "teams"?: Team[], "teamName"?: string, "scoreChange"?: number }`.
//! `teams` broadcasts a `teams` event; `teamName` + `scoreChange` together
//! broadcast a `score_update` event. One request may do both.
//!
//! The roster is relayed as sent. Only its array shape is checked; the
//! display owns the team fields.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use buzzline_protocol::frames::{KIND_SCORE_UPDATE, KIND_TEAMS};
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub teams: Option<Vec<Value>>,
    pub team_name: Option<String>,
    pub score_change: Option<Number>,
}

/// Payload of a `score_update` event.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreChange {
    team_name: String,
    score_change: Number,
}

fn rejection(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": message})),
    )
}

/// POST /publish-update: broadcast roster and/or score changes.
pub async fn publish_update(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let update: UpdateRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "invalid JSON in update body");
        rejection("Invalid JSON body")
    })?;

    let mut recognized = false;

    if let Some(teams) = update.teams {
        info!(teams = teams.len(), "team roster update");
        state.hub.publish(KIND_TEAMS, &teams).await;
        recognized = true;
    }

    if let (Some(team_name), Some(score_change)) = (update.team_name, update.score_change) {
        info!(team = %team_name, change = %score_change, "score change");
        state
            .hub
            .publish(
                KIND_SCORE_UPDATE,
                ScoreChange {
                    team_name,
                    score_change,
                },
            )
            .await;
        recognized = true;
    }

    if recognized {
        Ok(Json(json!({"success": true})))
    } else {
        Err(rejection("No recognized fields"))
    }
}
