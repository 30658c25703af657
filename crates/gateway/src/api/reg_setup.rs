//! `GET /reg_setup/{billing_request_id}` (spec §6): resolves a persisted
//! billing request to a fresh provider payment URL and redirects the parent
//! there. The token itself never leaves the payment provider's own session
//! machinery — this endpoint only ever hands back a redirect.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect};

use crate::state::AppState;

pub async fn reg_setup(State(state): State<AppState>, Path(billing_request_id): Path<String>) -> impl IntoResponse {
    match state.tools.payment.create_payment_link(&billing_request_id).await {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
