//! `POST /chat` — the dispatcher (spec §4.7, C7): classifies the turn,
//! builds the active agent, drives one model round-trip, and persists the
//! result. Structured like the teacher's `api::chat::chat` handler: resolve
//! session, acquire the per-session lock, run the turn, release on drop.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

use club_domain::session::{Classification, LastAgent};
use club_domain::tool::ToolId;
use club_routine::agent::{self, AgentVariant};
use club_routine::code;
use club_routine::engine;
use club_sessions::SessionBusy;

use crate::runtime::turn::{run_turn, TurnOutcome};
use crate::state::AppState;
use crate::teams::ConfigTeamResolver;

/// Recursion depth cap for the step-22 server-internal hop. One hop is all
/// the routine ever produces; this just guards against a misbehaving model
/// returning `routine_number: 22` twice in a row.
const MAX_DISPATCH_DEPTH: u8 = 3;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub routine_number: Option<u8>,
    #[serde(default)]
    pub last_agent: Option<LastAgent>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_agent: Option<LastAgent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routine_number: Option<u8>,
}

pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> impl IntoResponse {
    let session_id = body
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let _permit = match state.session_locks.acquire(&session_id).await {
        Ok(p) => p,
        Err(SessionBusy) => {
            return (
                axum::http::StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": "session_busy" })),
            )
                .into_response();
        }
    };

    match dispatch(&state, session_id.clone(), body.user_message, body.routine_number, body.last_agent, 0).await {
        Ok(result) => Json(ChatResponse {
            session_id,
            response: result.text,
            last_agent: Some(result.last_agent),
            routine_number: result.routine_number,
        })
        .into_response(),
        Err(message) => Json(serde_json::json!({
            "session_id": session_id,
            "response": message,
            "error": true,
        }))
        .into_response(),
    }
}

pub(crate) struct DispatchResult {
    pub(crate) text: String,
    pub(crate) last_agent: LastAgent,
    pub(crate) routine_number: Option<u8>,
}

/// One classification + model round-trip. Recurses exactly once more when
/// the model lands on step 22 (spec §4.7 step 4). Boxed because the step-22
/// hop re-enters this same function — an `async fn` can't recurse directly
/// without an infinitely-sized future. Also the photo-upload endpoints' entry
/// point into the same turn machinery, hinted onto step 34.
pub(crate) fn dispatch<'a>(
    state: &'a AppState,
    session_id: String,
    user_message: String,
    hint_routine: Option<u8>,
    hint_last_agent: Option<LastAgent>,
    depth: u8,
) -> Pin<Box<dyn Future<Output = Result<DispatchResult, String>> + Send + 'a>> {
    Box::pin(async move {
        let session = state.sessions.get(&session_id);

        // Hints default to the session's own persisted state: a client need
        // not re-supply routine/agent on every turn, but may override
        // explicitly (e.g. the upload worker forcing step 34 back into play).
        let effective_routine = hint_routine.or_else(|| session.as_ref().and_then(|s| s.routine_number));
        let effective_last_agent = hint_last_agent.or_else(|| session.as_ref().map(|s| s.last_agent));

        let (variant, step_text, new_code_context) =
            classify_turn(state, &session_id, &user_message, effective_routine, effective_last_agent);

        if let Some(ctx) = &new_code_context {
            let _ = state.sessions.set_code_context(&session_id, ctx.clone());
            state
                .sessions
                .append(
                    &session_id,
                    club_domain::message::Message::system(format!(
                        "AGENT_TRANSITION:{}->{}",
                        effective_last_agent.map(|a| format!("{a:?}")).unwrap_or_default(),
                        variant.name()
                    )),
                )
                .map_err(|e| e.to_string())?;
        }

        let (system, allowed): (String, HashSet<ToolId>) = agent::resolve(variant, step_text.as_deref());

        state
            .sessions
            .append(&session_id, club_domain::message::Message::user(user_message.clone()))
            .map_err(|e| e.to_string())?;

        let mut history = state.sessions.get(&session_id).map(|s| s.history).unwrap_or_default();

        let outcome = run_turn(
            state.model.as_ref(),
            &state.tools,
            &state.config.model,
            &system,
            &allowed,
            &mut history,
        )
        .await;

        match outcome {
            TurnOutcome::Final(reply) => {
                // `run_turn` already appended the new tool/assistant entries
                // to its working copy; persist the delta onto the store.
                persist_history(state, &session_id, history)?;

                let last_agent = variant_to_last_agent(variant);
                state.sessions.set_last_agent(&session_id, last_agent).map_err(|e| e.to_string())?;
                state
                    .sessions
                    .set_routine_number(&session_id, reply.next_routine.or(effective_routine))
                    .map_err(|e| e.to_string())?;

                if reply.next_routine == Some(engine::AGE_HOP_STEP) && depth < MAX_DISPATCH_DEPTH {
                    let age_group = state
                        .sessions
                        .get(&session_id)
                        .and_then(|s| s.code_context)
                        .map(|c| c.age_group)
                        .unwrap_or_else(|| "U99".to_string());

                    let over16 = engine::age_group_is_u16_plus(&age_group);
                    let ctx = engine::RoutineContext {
                        age_group_u16_plus: Some(over16),
                        ..Default::default()
                    };
                    let target =
                        engine::on_valid(engine::AGE_HOP_STEP, &ctx).unwrap_or(engine::AGE_HOP_UNDER_16_TARGET);
                    let synthesized = format!("(internal) age group {age_group} routes to step {target}");

                    return dispatch(
                        state,
                        session_id,
                        synthesized,
                        Some(target),
                        Some(LastAgent::NewRegistration),
                        depth + 1,
                    )
                    .await;
                }

                Ok(DispatchResult {
                    text: reply.text,
                    last_agent,
                    routine_number: reply.next_routine.or(effective_routine),
                })
            }
            TurnOutcome::Failure(kind) => {
                tracing::warn!(session_id = %session_id, kind = kind.as_str(), "turn failed");
                Ok(DispatchResult {
                    text: "Sorry, something went wrong on our end — please try that again.".to_string(),
                    last_agent: effective_last_agent.unwrap_or(LastAgent::None),
                    routine_number: effective_routine,
                })
            }
        }
    })
}

fn persist_history(state: &AppState, session_id: &str, history: Vec<club_domain::message::Message>) -> Result<(), String> {
    let current_len = state.sessions.get(session_id).map(|s| s.history.len()).unwrap_or(0);
    for message in history.into_iter().skip(current_len) {
        state.sessions.append(session_id, message).map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn variant_to_last_agent(variant: AgentVariant) -> LastAgent {
    match variant {
        AgentVariant::Generic => LastAgent::Generic,
        AgentVariant::NewRegistration => LastAgent::NewRegistration,
        AgentVariant::ReRegistration => LastAgent::ReRegistration,
    }
}

/// Turn classification, in the order spec §4.7 lists.
fn classify_turn(
    state: &AppState,
    session_id: &str,
    user_message: &str,
    hint_routine: Option<u8>,
    hint_last_agent: Option<LastAgent>,
) -> (AgentVariant, Option<String>, Option<club_domain::session::CodeContext>) {
    if let Some(n) = hint_routine {
        let text = engine::instruction_text(n).map(|s| s.to_string());
        return (AgentVariant::NewRegistration, text, None);
    }

    if hint_last_agent == Some(LastAgent::ReRegistration) {
        return (AgentVariant::ReRegistration, None, None);
    }

    if hint_last_agent == Some(LastAgent::NewRegistration) {
        return (AgentVariant::NewRegistration, None, None);
    }

    let already_has_context = state.sessions.get(session_id).and_then(|s| s.code_context).is_some();
    if !already_has_context {
        let resolver = ConfigTeamResolver::new(&state.config.teams);
        if let Ok(ctx) = code::parse_and_validate(user_message, &state.config.season.current_season, &resolver) {
            let variant = match ctx.classification {
                Classification::NewRegistration => AgentVariant::NewRegistration,
                Classification::ReRegistration => AgentVariant::ReRegistration,
            };
            let step_text = match variant {
                AgentVariant::NewRegistration => engine::instruction_text(engine::FIRST_STEP).map(|s| s.to_string()),
                AgentVariant::ReRegistration => Some(agent::RE_REGISTRATION_OPENER.to_string()),
                AgentVariant::Generic => None,
            };
            return (variant, step_text, Some(ctx));
        }
    }

    (*state.default_agent_mode.read(), None, None)
}

/// `POST /clear` — clears a session's history (spec §6).
pub async fn clear_session(
    State(state): State<AppState>,
    Json(body): Json<ClearRequest>,
) -> impl IntoResponse {
    match state.sessions.clear(&body.session_id) {
        Ok(()) => Json(serde_json::json!({ "cleared": true })).into_response(),
        Err(e) => (
            axum::http::StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_domain::config::Config;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::from_config(Arc::new(Config::default()))
    }

    #[tokio::test]
    async fn unknown_message_routes_to_generic_agent() {
        let state = state();
        let (variant, step, ctx) = classify_turn(&state, "s1", "hello there", None, None);
        assert_eq!(variant.name(), "generic");
        assert!(step.is_none());
        assert!(ctx.is_none());
    }

    #[tokio::test]
    async fn valid_code_routes_to_new_registration() {
        let state = state();
        let (variant, step, ctx) = classify_turn(&state, "s2", "200-Lions-U9-2526", None, None);
        assert_eq!(variant.name(), "new_registration");
        assert!(step.is_some());
        assert!(ctx.is_some());
    }

    #[tokio::test]
    async fn hint_routine_wins_over_everything() {
        let state = state();
        let (variant, step, _) = classify_turn(&state, "s3", "irrelevant", Some(5), Some(LastAgent::ReRegistration));
        assert_eq!(variant.name(), "new_registration");
        assert!(step.unwrap().contains("medical"));
    }

    #[tokio::test]
    async fn hinted_re_registration_has_no_step_text() {
        let state = state();
        let (variant, step, _) = classify_turn(&state, "s4", "anything", None, Some(LastAgent::ReRegistration));
        assert_eq!(variant.name(), "re_registration");
        assert!(step.is_none());
    }
}
