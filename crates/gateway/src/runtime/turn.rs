//! The model call loop (spec §4.3, C3): a non-streaming round-trip between
//! the dispatcher and the model, driving the tool-call loop and parsing the
//! model's final structured response.

use std::collections::HashSet;
use std::time::Duration;

use club_domain::config::ModelConfig;
use club_domain::error::Error;
use club_domain::message::Message;
use club_domain::tool::ToolId;
use club_providers::model::{ModelProvider, ModelReply, ModelRequest};
use club_providers::retry::with_backoff;
use club_providers::HealthStatus;
use club_tools::{build_tool_definitions, ToolRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReply {
    pub text: String,
    pub next_routine: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnFailureKind {
    ModelCallFailed,
    UnparseableResponse,
    ToolLoop,
    MaxAttempts,
}

impl TurnFailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnFailureKind::ModelCallFailed => "model_call_failed",
            TurnFailureKind::UnparseableResponse => "unparseable_response",
            TurnFailureKind::ToolLoop => "tool_loop",
            TurnFailureKind::MaxAttempts => "max_attempts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Final(FinalReply),
    Failure(TurnFailureKind),
}

const MAX_TOOL_LOOP_HARD_CAP: u32 = 8;

/// Drives one turn: instruction text, the session history (mutated in
/// place only on success), and the tool subset the active agent may call.
///
/// On `Failure`, `history` is left exactly as it was passed in, matching
/// spec §4.3's cancellation clause ("the session is left unchanged so the
/// user may retry").
pub async fn run_turn(
    model: &dyn ModelProvider,
    tools: &ToolRegistry,
    cfg: &ModelConfig,
    system: &str,
    allowed: &HashSet<ToolId>,
    history: &mut Vec<Message>,
) -> TurnOutcome {
    let turn_deadline = Duration::from_secs(cfg.turn_deadline_secs);
    let max_loops = cfg.max_tool_loops.min(MAX_TOOL_LOOP_HARD_CAP);

    let attempt_fut = with_backoff(
        cfg.retry_attempts,
        Duration::from_millis(cfg.retry_base_ms),
        |e| {
            tracing::warn!(error = %e, "model round-trip failed, retrying");
            true
        },
        |_attempt| one_round_trip(model, tools, cfg, system, allowed, max_loops, history.clone()),
    );

    match tokio::time::timeout(turn_deadline, attempt_fut).await {
        Ok(Ok((reply, updated_history))) => {
            *history = updated_history;
            TurnOutcome::Final(reply)
        }
        Ok(Err(e)) => TurnOutcome::Failure(kind_from_error(&e)),
        Err(_elapsed) => TurnOutcome::Failure(TurnFailureKind::ModelCallFailed),
    }
}

fn kind_from_error(e: &Error) -> TurnFailureKind {
    let text = e.to_string();
    if text.contains(TurnFailureKind::ToolLoop.as_str()) {
        TurnFailureKind::ToolLoop
    } else if text.contains(TurnFailureKind::UnparseableResponse.as_str()) {
        TurnFailureKind::UnparseableResponse
    } else {
        TurnFailureKind::ModelCallFailed
    }
}

/// One full tool-call loop for a single attempt: sends the request, executes
/// any requested tools, re-sends, up to `max_loops` rounds, then parses the
/// final content block. Operates on an owned copy of history so a failed
/// attempt never corrupts the caller's state; returns the updated history
/// alongside the parsed reply on success.
async fn one_round_trip(
    model: &dyn ModelProvider,
    tools: &ToolRegistry,
    cfg: &ModelConfig,
    system: &str,
    allowed: &HashSet<ToolId>,
    max_loops: u32,
    mut history: Vec<Message>,
) -> Result<(FinalReply, Vec<Message>), Error> {
    let tool_defs = build_tool_definitions(allowed);
    let call_deadline = Duration::from_secs(cfg.call_deadline_secs);

    for round in 0..max_loops {
        let request = ModelRequest {
            system: system.to_string(),
            messages: history.clone(),
            tools: tool_defs.clone(),
            model: cfg.model.clone(),
        };

        let reply = model
            .call(&request, call_deadline)
            .await
            .map_err(|e| Error::Other(format!("model_call_failed: {e}")))?;

        match reply {
            ModelReply::ToolCalls(calls) => {
                for call in calls {
                    let (line, _is_error) = tools.dispatch(&call.tool_name, &call.arguments).await;
                    history.push(Message::tool(line));
                }
            }
            ModelReply::Final(text) => {
                let parsed = parse_final(&text)
                    .ok_or_else(|| Error::Other("unparseable_response: empty model output".to_string()))?;
                history.push(Message::assistant(parsed.text.clone()));
                return Ok((parsed, history));
            }
        }

        if round + 1 == max_loops {
            return Err(Error::Other("tool_loop: exceeded max tool-call rounds".to_string()));
        }
    }

    Err(Error::Other("tool_loop: exceeded max tool-call rounds".to_string()))
}

/// Three-shape structured-response parser (spec §4.3 step 3):
/// a) `{"agent_final_response": "...", "routine_number": n?}`
/// b) a flat text field whose *value* is itself such a JSON object
/// c) the raw text, with no routine number
fn parse_final(text: &str) -> Option<FinalReply> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(reply) = try_parse_structured(trimmed) {
        return Some(reply);
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for value in map.values() {
            if let serde_json::Value::String(inner) = value {
                if let Some(reply) = try_parse_structured(inner) {
                    return Some(reply);
                }
            }
        }
    }

    Some(FinalReply {
        text: trimmed.to_string(),
        next_routine: None,
    })
}

fn try_parse_structured(candidate: &str) -> Option<FinalReply> {
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    let obj = value.as_object()?;
    let text = obj.get("agent_final_response")?.as_str()?.to_string();
    let next_routine = obj
        .get("routine_number")
        .and_then(|v| v.as_u64())
        .map(|n| n as u8);
    Some(FinalReply { text, next_routine })
}

/// Probes the model adapter directly; used by `GET /health` and `doctor`.
pub async fn model_health(model: &dyn ModelProvider) -> HealthStatus {
    model.health().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_providers::model::FakeModelProvider;
    use club_providers::{FakeAddressLookupProvider, FakeObjectStore, FakePaymentProvider, FakeSmsProvider, InMemoryRecordTable};
    use club_photo::UnavailableHeicDecoder;
    use std::sync::Arc;

    fn fake_registry() -> ToolRegistry {
        ToolRegistry {
            address_lookup: Arc::new(FakeAddressLookupProvider),
            record_table: Arc::new(InMemoryRecordTable::new()),
            payment: Arc::new(FakePaymentProvider),
            sms: Arc::new(FakeSmsProvider),
            object_store: Arc::new(FakeObjectStore::default()),
            heic_decoder: Arc::new(UnavailableHeicDecoder),
        }
    }

    #[test]
    fn parses_structured_shape_a() {
        let reply = parse_final(r#"{"agent_final_response": "hi there", "routine_number": 3}"#).unwrap();
        assert_eq!(reply.text, "hi there");
        assert_eq!(reply.next_routine, Some(3));
    }

    #[test]
    fn parses_flat_field_shape_b() {
        let text = serde_json::json!({
            "output": "{\"agent_final_response\": \"nested\"}"
        })
        .to_string();
        let reply = parse_final(&text).unwrap();
        assert_eq!(reply.text, "nested");
    }

    #[test]
    fn falls_back_to_raw_text_shape_c() {
        let reply = parse_final("just plain text").unwrap();
        assert_eq!(reply.text, "just plain text");
        assert_eq!(reply.next_routine, None);
    }

    #[tokio::test]
    async fn final_reply_commits_history() {
        let model = FakeModelProvider::new(vec![ModelReply::Final(
            r#"{"agent_final_response": "ok", "routine_number": 2}"#.to_string(),
        )]);
        let registry = fake_registry();
        let cfg = ModelConfig::default();
        let allowed = HashSet::from([ToolId::CheckIfRecordExistsInDb]);
        let mut history = vec![Message::user("hello")];

        let outcome = run_turn(&model, &registry, &cfg, "system prompt", &allowed, &mut history).await;
        match outcome {
            TurnOutcome::Final(reply) => {
                assert_eq!(reply.text, "ok");
                assert_eq!(reply.next_routine, Some(2));
            }
            TurnOutcome::Failure(k) => panic!("expected final reply, got {k:?}"),
        }
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn tool_call_then_final() {
        let model = FakeModelProvider::new(vec![
            ModelReply::ToolCalls(vec![club_domain::tool::ToolCall {
                call_id: "c1".to_string(),
                tool_name: "check_if_record_exists_in_db".to_string(),
                arguments: serde_json::json!({ "parent_name": "John Smith", "child_name": "Alice Smith" }),
            }]),
            ModelReply::Final(r#"{"agent_final_response": "done"}"#.to_string()),
        ]);
        let registry = fake_registry();
        let cfg = ModelConfig::default();
        let allowed = HashSet::from([ToolId::CheckIfRecordExistsInDb]);
        let mut history = vec![Message::user("hi")];

        let outcome = run_turn(&model, &registry, &cfg, "system", &allowed, &mut history).await;
        assert!(matches!(outcome, TurnOutcome::Final(_)));
        // user + tool result + assistant final
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn failure_leaves_history_unchanged() {
        let model = FakeModelProvider::new(vec![]); // no scripted replies -> immediate error
        let registry = fake_registry();
        let mut cfg = ModelConfig::default();
        cfg.retry_attempts = 1;
        let allowed = HashSet::from([ToolId::CheckIfRecordExistsInDb]);
        let mut history = vec![Message::user("hi")];
        let original_len = history.len();

        let outcome = run_turn(&model, &registry, &cfg, "system", &allowed, &mut history).await;
        assert!(matches!(outcome, TurnOutcome::Failure(_)));
        assert_eq!(history.len(), original_len);
    }
}
