//! `GET /agent/status`, `POST /agent/mode` (spec §6): introspect and switch
//! the default agent variant a turn falls back to when it carries no
//! routine/agent hint and its message doesn't parse as a registration code.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use club_routine::agent::AgentVariant;

use crate::state::AppState;

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let mode = *state.default_agent_mode.read();
    Json(serde_json::json!({ "default_agent_mode": mode.name() }))
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

pub async fn set_mode(State(state): State<AppState>, Json(body): Json<ModeRequest>) -> impl IntoResponse {
    match AgentVariant::from_name(&body.mode) {
        Some(variant) => {
            *state.default_agent_mode.write() = variant;
            (StatusCode::OK, Json(serde_json::json!({ "default_agent_mode": variant.name() }))).into_response()
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": format!("unknown agent mode: {}", body.mode) })),
        )
            .into_response(),
    }
}
