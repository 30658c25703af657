pub mod agent;
pub mod auth;
pub mod chat;
pub mod health;
pub mod reg_setup;
pub mod upload;
pub mod webhooks;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Builds the full API router (spec §6).
///
/// `/health` is public; every other route sits behind the bearer-token
/// middleware, mirroring the teacher's public/protected split.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/health", get(health::health));

    let protected = Router::new()
        .route("/chat", post(chat::chat))
        .route("/clear", post(chat::clear_session))
        .route("/upload", post(upload::upload_photo))
        .route("/upload-async", post(upload::upload_photo_async))
        .route("/upload-status/:session_id", get(upload::upload_status))
        .route("/agent/status", get(agent::status))
        .route("/agent/mode", post(agent::set_mode))
        .route("/webhooks/payment-provider", post(webhooks::payment_provider_webhook))
        .route("/reg_setup/:billing_request_id", get(reg_setup::reg_setup))
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
