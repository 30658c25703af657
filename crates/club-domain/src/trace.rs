use serde::Serialize;

/// Structured trace events emitted across the `club-*` crates. Each is
/// logged as a single JSON-tagged `tracing` event so operators can grep a
/// stable `event` field rather than parsing free-text log lines.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        session_id: String,
        is_new: bool,
    },
    SessionReset {
        session_id: String,
        reason: String,
    },
    SessionSwept {
        session_id: String,
        idle_seconds: i64,
    },
    HistoryEvicted {
        session_id: String,
        evicted: usize,
        remaining: usize,
    },
    ToolDispatched {
        session_id: String,
        tool_name: String,
        is_error: bool,
        duration_ms: u64,
    },
    ModelRequest {
        session_id: String,
        agent: String,
        round: u32,
        duration_ms: u64,
    },
    ModelRetry {
        session_id: String,
        attempt: u32,
        wait_ms: u64,
        reason: String,
    },
    RoutineTransition {
        session_id: String,
        from: Option<u8>,
        to: Option<u8>,
        server_internal: bool,
    },
    WebhookEventProcessed {
        event_id: String,
        resource: String,
        action: String,
        status: String,
    },
    SiblingDiscountApplied {
        billing_request_id: String,
        sibling_billing_request_id: String,
    },
    PhotoPipelineStage {
        session_id: String,
        stage: String,
        fallback_to_original: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "club_event");
    }
}
