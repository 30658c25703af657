//! `GET /health` (spec §6, public, no auth): aggregates every adapter's own
//! health probe, matching the teacher's lightweight health-probe shape.

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use club_providers::HealthStatus;

use crate::state::AppState;

fn status_str(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
        HealthStatus::Unreachable => "unreachable",
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let adapters = state.adapter_health().await;
    let overall_healthy = adapters.iter().all(|(_, s)| matches!(s, HealthStatus::Healthy));

    Json(serde_json::json!({
        "status": if overall_healthy { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "adapters": adapters
            .into_iter()
            .map(|(name, status)| (name, status_str(status)))
            .collect::<std::collections::BTreeMap<_, _>>(),
    }))
}
