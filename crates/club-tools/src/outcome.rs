use serde_json::Value;

/// Result of one tool execution: the structured payload the dispatcher
/// hands back to the model loop, plus enough to render the session-history
/// summary line required by spec §4.2.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub payload: Value,
    pub is_error: bool,
    pub kind: Option<&'static str>,
}

impl ToolOutcome {
    pub fn ok(payload: Value) -> Self {
        ToolOutcome {
            payload,
            is_error: false,
            kind: None,
        }
    }

    pub fn err(kind: &'static str, payload: Value) -> Self {
        ToolOutcome {
            payload,
            is_error: true,
            kind: Some(kind),
        }
    }

    pub fn err_msg(kind: &'static str, message: impl Into<String>) -> Self {
        Self::err(kind, serde_json::json!({ "error": message.into() }))
    }

    /// `"tool=<name> status=<ok|err:<kind>> <short result>"` (spec §4.2).
    pub fn history_line(&self, tool_name: &str) -> String {
        let status = match (self.is_error, self.kind) {
            (true, Some(kind)) => format!("err:{kind}"),
            (true, None) => "err:unknown".to_string(),
            (false, _) => "ok".to_string(),
        };
        let mut short = serde_json::to_string(&self.payload).unwrap_or_default();
        if short.len() > 240 {
            short.truncate(240);
            short.push_str("...");
        }
        format!("tool={tool_name} status={status} {short}")
    }
}

pub fn missing_arg(field: &str) -> ToolOutcome {
    ToolOutcome::err_msg("invalid_arguments", format!("missing required argument: {field}"))
}

pub fn get_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolOutcome> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| missing_arg(key))
}

pub fn get_str_opt<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

pub fn get_bool(args: &Value, key: &str) -> Result<bool, ToolOutcome> {
    args.get(key).and_then(Value::as_bool).ok_or_else(|| missing_arg(key))
}

pub fn get_i64(args: &Value, key: &str) -> Result<i64, ToolOutcome> {
    args.get(key).and_then(Value::as_i64).ok_or_else(|| missing_arg(key))
}

pub fn get_f64(args: &Value, key: &str) -> Result<f64, ToolOutcome> {
    args.get(key).and_then(Value::as_f64).ok_or_else(|| missing_arg(key))
}
