use async_trait::async_trait;
use club_domain::error::{Error, Result};
use club_domain::message::Message;
use club_domain::tool::{ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::health::HealthStatus;

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub enum ModelReply {
    ToolCalls(Vec<ToolCall>),
    Final(String),
}

/// The external model provider, treated as an RPC that accepts a system
/// prompt + message list + tool schemas and returns either a final
/// structured message or tool-call requests (spec §1/§4.3).
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn call(&self, request: &ModelRequest, timeout: Duration) -> Result<ModelReply>;
    async fn health(&self) -> HealthStatus;
    fn provider_id(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<WireMessage>,
    tools: &'a [ToolDefinition],
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    call_id: String,
    tool_name: String,
    arguments: serde_json::Value,
}

pub struct HttpModelProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpModelProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpModelProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ModelProvider for HttpModelProvider {
    async fn call(&self, request: &ModelRequest, timeout: Duration) -> Result<ModelReply> {
        let wire = WireRequest {
            model: &request.model,
            system: &request.system,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: format!("{:?}", m.role).to_lowercase(),
                    content: m.content.clone(),
                })
                .collect(),
            tools: &request.tools,
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&wire)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error("model", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::adapter(
                "model",
                format!("model provider returned {status}"),
                status.is_server_error() || status.as_u16() == 429,
            ));
        }

        let parsed: WireReply = resp
            .json()
            .await
            .map_err(|e| Error::Other(format!("invalid model response json: {e}")))?;

        if !parsed.tool_calls.is_empty() {
            Ok(ModelReply::ToolCalls(
                parsed
                    .tool_calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        call_id: tc.call_id,
                        tool_name: tc.tool_name,
                        arguments: tc.arguments,
                    })
                    .collect(),
            ))
        } else {
            Ok(ModelReply::Final(parsed.content.unwrap_or_default()))
        }
    }

    async fn health(&self) -> HealthStatus {
        match self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => HealthStatus::Healthy,
            Ok(_) => HealthStatus::Degraded,
            Err(_) => HealthStatus::Unreachable,
        }
    }

    fn provider_id(&self) -> &str {
        "http_model"
    }
}

fn classify_reqwest_error(provider: &str, e: reqwest::Error) -> Error {
    let retryable = e.is_timeout() || e.is_connect() || e.status().map(|s| s.is_server_error()).unwrap_or(false);
    Error::adapter(provider, e.to_string(), retryable)
}

/// In-memory fake used by tests: returns a scripted sequence of replies.
pub struct FakeModelProvider {
    pub replies: parking_lot::Mutex<Vec<ModelReply>>,
}

impl FakeModelProvider {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        FakeModelProvider {
            replies: parking_lot::Mutex::new(replies),
        }
    }
}

#[async_trait]
impl ModelProvider for FakeModelProvider {
    async fn call(&self, _request: &ModelRequest, _timeout: Duration) -> Result<ModelReply> {
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            return Err(Error::adapter("fake_model", "no scripted replies left", false));
        }
        Ok(replies.remove(0))
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }

    fn provider_id(&self) -> &str {
        "fake_model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_provider_returns_scripted_replies_in_order() {
        let provider = FakeModelProvider::new(vec![ModelReply::Final("hello".to_string())]);
        let request = ModelRequest {
            system: String::new(),
            messages: vec![],
            tools: vec![],
            model: "test".to_string(),
        };
        match provider.call(&request, Duration::from_secs(1)).await.unwrap() {
            ModelReply::Final(text) => assert_eq!(text, "hello"),
            _ => panic!("expected final reply"),
        }
    }
}
